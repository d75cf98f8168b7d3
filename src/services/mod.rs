//! Services
//!
//! Notification pipeline, host adapter and HTTP plumbing.

pub mod host;
pub mod proxy;
pub mod webhook;

pub use host::StaticHost;
pub use webhook::NotifyService;
