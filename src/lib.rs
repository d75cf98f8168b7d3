//! Sentry DingTalk - error notifications for DingTalk robots
//!
//! This library formats error events handed over by a Sentry-style host into
//! DingTalk chat messages and posts them to a robot webhook.
//! It includes:
//! - The notification pipeline (extract, compose, sign, deliver)
//! - A static host adapter for hosts without a tag store
//! - The HTTP client factory with per-project proxy support
//!
//! Host data types and project configuration live in `sentry-dingtalk-core`
//! and are re-exported here.

pub mod services;

pub use sentry_dingtalk_core::{
    CoreError, CoreResult, Event, Group, HostContext, Language, MessageKind, Notification,
    Organization, Project, ProjectConfig, ProxyConfig, ProxyProtocol, Rule, TitleTemplate,
};

pub use services::host::StaticHost;
pub use services::webhook::{
    dispatch_on_event, dispatch_with_options, ComposedMessage, DeliveryOutcome, DeliveryRecord,
    DeliveryStatus, DingtalkChannel, NotificationRequest, NotifyResult, NotifyService,
    SkipReason, TriggeringRule, WebhookChannel, WebhookError, WebhookTestResult,
};
