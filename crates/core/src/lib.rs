//! Sentry DingTalk Core
//!
//! Plain data and configuration types shared between the notifier and the
//! host adapters that drive it. This crate has no HTTP, async or crypto
//! dependencies.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `host` - Notification data handed over by the host and the `HostContext` lookups
//! - `config` - Per-project plugin options (`ProjectConfig`, `MessageKind`, `TitleTemplate`)
//! - `proxy` - Outbound proxy settings

pub mod config;
pub mod error;
pub mod host;
pub mod proxy;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Host Interface ─────────────────────────────────────────────────────
pub use host::{Event, Group, HostContext, Notification, Organization, Project, Rule};

// ── Configuration ──────────────────────────────────────────────────────
pub use config::{Language, MessageKind, ProjectConfig, TitleTemplate};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
