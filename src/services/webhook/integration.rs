//! Host Dispatch Integration
//!
//! Entry points for host notification dispatchers. Each notification runs on
//! its own tokio task, so a slow or hanging webhook for one project never
//! holds up delivery for another.

use std::sync::Arc;

use sentry_dingtalk_core::{Notification, ProjectConfig};
use tokio::task::JoinHandle;

use super::service::NotifyService;
use super::types::*;

/// Fire-and-forget delivery of one notification.
///
/// The returned handle resolves to the delivery record, or `None` when the
/// project is not configured. Callers that do not care may drop it.
pub fn dispatch_on_event(
    service: Arc<NotifyService>,
    notification: Notification,
    config: ProjectConfig,
) -> JoinHandle<Option<DeliveryRecord>> {
    tokio::spawn(async move {
        match service.notify(&notification, &config, false).await {
            Ok(NotifyResult::Delivered(record)) => {
                tracing::debug!(
                    project = %record.project,
                    delivery_id = %record.id,
                    status = %record.status,
                    "Webhook dispatch finished"
                );
                Some(record)
            }
            Ok(NotifyResult::Skipped(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Webhook dispatch failed");
                None
            }
        }
    })
}

/// Like `dispatch_on_event`, taking the host's raw option map.
///
/// Option parsing happens before spawning so a malformed map is reported to
/// the caller instead of disappearing inside the task.
pub fn dispatch_with_options(
    service: Arc<NotifyService>,
    notification: Notification,
    options: &serde_json::Value,
) -> Result<JoinHandle<Option<DeliveryRecord>>, WebhookError> {
    let config = ProjectConfig::from_options(options)?;
    Ok(dispatch_on_event(service, notification, config))
}
