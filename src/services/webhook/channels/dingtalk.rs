//! DingTalk Robot Webhook Channel
//!
//! Sends notifications to a DingTalk custom robot using either the `markdown`
//! or the `actionCard` message type. Supports the robot's optional
//! HMAC-SHA256 URL signature.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use sentry_dingtalk_core::{MessageKind, ProjectConfig};

use super::WebhookChannel;
use crate::services::proxy::{build_http_client, ProxyConfig};
use crate::services::webhook::signing;
use crate::services::webhook::types::{ComposedMessage, DeliveryOutcome, WebhookError};

/// Label of the single action card button.
pub const VISIT_ISSUE_TITLE: &str = "Visit Issue Link";

/// Request body accepted by `https://oapi.dingtalk.com/robot/send`.
#[derive(Debug, Serialize)]
pub struct DingtalkMessage {
    pub msgtype: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<MarkdownContent>,
    #[serde(rename = "actionCard", skip_serializing_if = "Option::is_none")]
    pub action_card: Option<ActionCardContent>,
}

#[derive(Debug, Serialize)]
pub struct MarkdownContent {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCardContent {
    pub title: String,
    pub text: String,
    /// `"0"` stacks buttons vertically; there is only one button anyway.
    pub btn_orientation: &'static str,
    pub single_title: &'static str,
    #[serde(rename = "singleURL")]
    pub single_url: String,
}

impl DingtalkMessage {
    pub fn from_composed(message: &ComposedMessage) -> Self {
        let text = message.text();
        match message.message_kind {
            MessageKind::Markdown => Self {
                msgtype: "markdown",
                markdown: Some(MarkdownContent {
                    title: message.title.clone(),
                    text,
                }),
                action_card: None,
            },
            MessageKind::ActionCard => Self {
                msgtype: "actionCard",
                markdown: None,
                action_card: Some(ActionCardContent {
                    title: message.title.clone(),
                    text,
                    btn_orientation: "0",
                    single_title: VISIT_ISSUE_TITLE,
                    single_url: message.action_link.clone(),
                }),
            },
        }
    }
}

/// Response body; DingTalk answers HTTP 200 even for rejected messages.
#[derive(Debug, Deserialize)]
struct DingtalkResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// The robot's reply when it carries a non-zero `errcode`.
fn rejection(body: &str) -> Option<DingtalkResponse> {
    serde_json::from_str::<DingtalkResponse>(body)
        .ok()
        .filter(|reply| reply.errcode != 0)
}

/// DingTalk custom robot integration.
///
/// Webhook URL format: `https://oapi.dingtalk.com/robot/send?access_token=xxx`
pub struct DingtalkChannel {
    client: reqwest::Client,
}

impl DingtalkChannel {
    pub fn new(proxy: Option<&ProxyConfig>, timeout: Duration) -> Result<Self, WebhookError> {
        Ok(Self {
            client: build_http_client(proxy, timeout)?,
        })
    }

    /// Webhook URL for this attempt, signed when the project has a secret.
    pub fn target_url(config: &ProjectConfig, timestamp_ms: i64) -> Result<String, WebhookError> {
        match config.signing_secret() {
            Some(secret) => signing::sign_url(config.webhook_url(), secret, timestamp_ms),
            None => Ok(config.webhook_url().to_string()),
        }
    }

    /// Projects with their own proxy get a dedicated client.
    fn client_for(&self, config: &ProjectConfig) -> Result<reqwest::Client, WebhookError> {
        match config.proxy {
            Some(ref proxy) => build_http_client(Some(proxy), config.timeout()),
            None => Ok(self.client.clone()),
        }
    }

    async fn post(&self, message: &ComposedMessage, config: &ProjectConfig) -> Result<u16, WebhookError> {
        let url = Self::target_url(config, signing::current_timestamp_ms())?;
        let body = self.format_message(message)?;
        let client = self.client_for(config)?;

        let response = client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/plain")
            .timeout(config.timeout())
            .body(body.into_bytes())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                kind = %message.message_kind,
                "DingTalk returned non-success status"
            );
            return Ok(status.as_u16());
        }

        match response.text().await {
            Ok(text) => {
                if let Some(reply) = rejection(&text) {
                    tracing::warn!(
                        errcode = reply.errcode,
                        errmsg = %reply.errmsg,
                        "DingTalk rejected message"
                    );
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read DingTalk response body");
            }
        }

        Ok(status.as_u16())
    }
}

#[async_trait]
impl WebhookChannel for DingtalkChannel {
    fn name(&self) -> &'static str {
        "dingtalk"
    }

    async fn deliver(&self, message: &ComposedMessage, config: &ProjectConfig) -> DeliveryOutcome {
        match self.post(message, config).await {
            Ok(status_code) => DeliveryOutcome::Success { status_code },
            Err(e) => DeliveryOutcome::Failure {
                retryable: e.is_retryable(),
                reason: e.to_string(),
            },
        }
    }

    fn format_message(&self, message: &ComposedMessage) -> Result<String, WebhookError> {
        Ok(serde_json::to_string(&DingtalkMessage::from_composed(message))?)
    }
}
