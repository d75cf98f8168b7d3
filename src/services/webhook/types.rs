//! Webhook Core Types
//!
//! Request-scoped data flowing through the notification pipeline
//! (extract -> compose -> deliver) and the error type shared by its stages.
//! Nothing here is persisted; delivery records are handed back to the host
//! for logging.

use serde::{Deserialize, Serialize};
use std::fmt;

use sentry_dingtalk_core::{CoreError, MessageKind};

/// Alert rule that triggered the notification, resolved to absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeringRule {
    pub label: String,
    pub settings_url: String,
}

/// Everything the composer needs, pulled out of a host notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Project display name, used for log context only.
    pub project: String,
    pub event_title: String,
    /// `(key label, value label)` pairs in host order.
    pub tags: Vec<(String, String)>,
    pub issue_url: String,
    pub triggering_rule: Option<TriggeringRule>,
}

/// A formatted chat message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub title: String,
    /// Markdown sections appended after the title. May be empty.
    pub body: String,
    /// Issue URL, used as the action card button target.
    pub action_link: String,
    pub message_kind: MessageKind,
}

impl ComposedMessage {
    /// Full markdown text as sent to DingTalk: title followed by the body.
    pub fn text(&self) -> String {
        format!("{}{}", self.title, self.body)
    }
}

/// Result of a single POST attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// An HTTP response was received (any status).
    Success { status_code: u16 },
    /// The request could not be built, sent or completed.
    Failure { reason: String, retryable: bool },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Delivery status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of one notification's delivery, for host-side logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub project: String,
    pub message_kind: String,
    pub status: DeliveryStatus,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub attempts: u32,
    pub last_attempt_at: String,
    pub created_at: String,
}

impl DeliveryRecord {
    /// Create a record before the first attempt.
    pub fn new(project: &str, message_kind: MessageKind) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project: project.to_string(),
            message_kind: message_kind.to_string(),
            status: DeliveryStatus::Failed,
            status_code: None,
            error: None,
            attempts: 0,
            last_attempt_at: now.clone(),
            created_at: now,
        }
    }

    /// Fold an attempt's outcome into the record.
    pub fn record_attempt(&mut self, outcome: &DeliveryOutcome) {
        self.attempts += 1;
        self.last_attempt_at = chrono::Utc::now().to_rfc3339();
        match outcome {
            DeliveryOutcome::Success { status_code } => {
                self.status = DeliveryStatus::Success;
                self.status_code = Some(*status_code);
                self.error = None;
            }
            DeliveryOutcome::Failure { reason, .. } => {
                self.status = DeliveryStatus::Failed;
                self.status_code = None;
                self.error = Some(reason.clone());
            }
        }
    }
}

/// Why a notification was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The project has no webhook configured.
    ConfigurationMissing,
}

/// Result of `NotifyService::notify`.
#[derive(Debug, Clone)]
pub enum NotifyResult {
    Skipped(SkipReason),
    Delivered(DeliveryRecord),
}

impl NotifyResult {
    pub fn record(&self) -> Option<&DeliveryRecord> {
        match self {
            Self::Delivered(record) => Some(record),
            Self::Skipped(_) => None,
        }
    }
}

/// Result of testing a project's webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTestResult {
    pub success: bool,
    pub latency_ms: Option<u32>,
    pub error: Option<String>,
}

/// Webhook-specific errors
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

impl WebhookError {
    /// Whether a later attempt could succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HttpError(_))
    }
}

impl From<reqwest::Error> for WebhookError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<CoreError> for WebhookError {
    fn from(err: CoreError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
