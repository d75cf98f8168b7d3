//! Notify Service
//!
//! Runs the notification pipeline for one event: is-configured gate, context
//! extraction, composition and delivery with optional bounded retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sentry_dingtalk_core::config::DEFAULT_TIMEOUT_SECS;
use sentry_dingtalk_core::{HostContext, Notification, ProjectConfig};

use super::channels::{DingtalkChannel, WebhookChannel};
use super::composer::compose;
use super::extractor::extract;
use super::types::*;

/// Title used by `test_configuration`.
pub const TEST_MESSAGE_TITLE: &str = "Test notification from Sentry";

/// Upper bound on the backoff exponent, keeps the delay from overflowing.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(1u32 << exponent)
}

/// Notification pipeline bound to a host and a delivery channel.
///
/// Holds no per-notification state; one instance can serve every project
/// concurrently.
pub struct NotifyService {
    host: Arc<dyn HostContext>,
    channel: Box<dyn WebhookChannel>,
}

impl NotifyService {
    /// Create a service delivering to DingTalk with the default timeout.
    pub fn new(host: Arc<dyn HostContext>) -> Result<Self, WebhookError> {
        let channel = DingtalkChannel::new(None, Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
        Ok(Self::with_channel(host, Box::new(channel)))
    }

    pub fn with_channel(host: Arc<dyn HostContext>, channel: Box<dyn WebhookChannel>) -> Self {
        Self { host, channel }
    }

    /// Format `notification` and post it to the project's webhook.
    ///
    /// Unconfigured projects are skipped without any HTTP call. Delivery
    /// failures are logged and returned in the record; with
    /// `raise_exception` they are returned as `WebhookError::DeliveryFailed`
    /// instead, for hosts that want to surface them.
    pub async fn notify(
        &self,
        notification: &Notification,
        config: &ProjectConfig,
        raise_exception: bool,
    ) -> Result<NotifyResult, WebhookError> {
        let project = notification.event.group.project.full_name();

        if !config.is_configured() {
            tracing::debug!(project = %project, "Webhook not configured, skipping notification");
            return Ok(NotifyResult::Skipped(SkipReason::ConfigurationMissing));
        }

        let request = extract(notification, self.host.as_ref());
        let message = compose(&request, config, self.host.as_ref());
        let record = self.deliver_with_retry(&message, config, project).await;

        if raise_exception && record.status == DeliveryStatus::Failed {
            return Err(WebhookError::DeliveryFailed(
                record.error.clone().unwrap_or_default(),
            ));
        }

        Ok(NotifyResult::Delivered(record))
    }

    /// Send a fixed test message through the project's configuration.
    pub async fn test_configuration(
        &self,
        config: &ProjectConfig,
    ) -> Result<WebhookTestResult, WebhookError> {
        config.validate()?;

        let request = NotificationRequest {
            project: "test".to_string(),
            event_title: TEST_MESSAGE_TITLE.to_string(),
            tags: vec![("environment".to_string(), "test".to_string())],
            issue_url: self.host.absolute_uri("/"),
            triggering_rule: None,
        };
        let message = compose(&request, config, self.host.as_ref());

        let start = Instant::now();
        let outcome = self.channel.deliver(&message, config).await;
        let latency_ms = Some(start.elapsed().as_millis() as u32);

        Ok(match outcome {
            DeliveryOutcome::Success { .. } => WebhookTestResult {
                success: true,
                latency_ms,
                error: None,
            },
            DeliveryOutcome::Failure { reason, .. } => WebhookTestResult {
                success: false,
                latency_ms,
                error: Some(reason),
            },
        })
    }

    async fn deliver_with_retry(
        &self,
        message: &ComposedMessage,
        config: &ProjectConfig,
        project: &str,
    ) -> DeliveryRecord {
        let mut record = DeliveryRecord::new(project, message.message_kind);
        let max_attempts = config.max_attempts();

        loop {
            let outcome = self.channel.deliver(message, config).await;
            record.record_attempt(&outcome);

            match outcome {
                DeliveryOutcome::Success { status_code } => {
                    tracing::info!(
                        project = %project,
                        channel = self.channel.name(),
                        delivery_id = %record.id,
                        status = status_code,
                        attempt = record.attempts,
                        "Notification delivered"
                    );
                    break;
                }
                DeliveryOutcome::Failure { reason, retryable } => {
                    if !retryable || record.attempts >= max_attempts {
                        tracing::warn!(
                            project = %project,
                            channel = self.channel.name(),
                            delivery_id = %record.id,
                            attempt = record.attempts,
                            error = %reason,
                            "Notification delivery failed"
                        );
                        break;
                    }

                    let delay = backoff_delay(config.retry_backoff(), record.attempts);
                    tracing::warn!(
                        project = %project,
                        delivery_id = %record.id,
                        attempt = record.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Notification delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        record
    }
}

impl std::fmt::Debug for NotifyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyService")
            .field("channel", &self.channel.name())
            .finish()
    }
}
