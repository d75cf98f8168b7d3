//! Webhook Channel Trait
//!
//! Defines the async trait a delivery channel must satisfy, plus channel
//! module exports. `NotifyService` only talks to this trait, so tests can
//! swap in a recording channel.

pub mod dingtalk;

use async_trait::async_trait;

use sentry_dingtalk_core::ProjectConfig;

use super::types::{ComposedMessage, DeliveryOutcome, WebhookError};

pub use dingtalk::DingtalkChannel;

/// Async trait for webhook channel implementations.
///
/// Each channel is responsible for serializing a composed message to its
/// platform's schema and POSTing it.
#[async_trait]
pub trait WebhookChannel: Send + Sync {
    /// Channel name, for logs.
    fn name(&self) -> &'static str;

    /// Make one delivery attempt. Never panics; every failure is an outcome.
    async fn deliver(&self, message: &ComposedMessage, config: &ProjectConfig) -> DeliveryOutcome;

    /// Serialize the message to the platform's JSON body.
    fn format_message(&self, message: &ComposedMessage) -> Result<String, WebhookError>;
}
