//! Project Configuration
//!
//! Per-project plugin options as the host stores them. The host resolves the
//! option map once per notification and hands it over as JSON; this module
//! turns it into a typed `ProjectConfig`.
//!
//! Option values arrive loosely typed (booleans as `"on"`, numbers as strings,
//! lists as comma-separated strings, unset options as `null`), so every field
//! is parsed leniently. A value that cannot be understood falls back to the
//! option's default with a warning instead of failing the whole map.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::{CoreError, CoreResult};
use crate::proxy::ProxyConfig;

/// Default per-attempt request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of delivery attempts (no retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Default delay before the first retry; doubled for each further retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// DingTalk robot message schema to target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// `msgtype: "markdown"` - title plus freeform markdown text.
    #[default]
    Markdown,
    /// `msgtype: "actionCard"` - text plus a single "visit issue" button.
    #[serde(alias = "actionCard")]
    ActionCard,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::ActionCard => write!(f, "actionCard"),
        }
    }
}

/// Language of the fixed sentences embedded in a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

/// Title decoration built from `custom_keyword` / `custom_message`.
///
/// DingTalk robots with keyword security only accept messages whose text
/// contains one of the configured keywords, hence the prefix slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleTemplate {
    pub keyword: Option<String>,
    pub message: Option<String>,
}

impl TitleTemplate {
    /// `"[{keyword}] {title} ({message})"`, each part only when set.
    pub fn apply(&self, title: &str) -> String {
        if self.is_identity() {
            return title.to_string();
        }

        let mut out = String::with_capacity(title.len());
        if let Some(ref keyword) = self.keyword {
            out.push_str(&format!("[{}] ", keyword));
        }
        out.push_str(title);
        if let Some(ref message) = self.message {
            out.push_str(&format!(" ({})", message));
        }
        out
    }

    pub fn is_identity(&self) -> bool {
        self.keyword.is_none() && self.message.is_none()
    }
}

/// Per-project plugin configuration.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Robot webhook URL. Empty means the plugin is not configured.
    #[serde(deserialize_with = "lenient_string")]
    pub webhook: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub custom_keyword: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub custom_message: Option<String>,
    /// HMAC signing secret (`SEC...`). Enables URL signing when set.
    #[serde(deserialize_with = "lenient_opt_string")]
    pub signature: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub include_tags: bool,
    /// Lower-cased tag keys to include; empty includes all.
    #[serde(deserialize_with = "lenient_key_set")]
    pub included_tag_keys: BTreeSet<String>,
    /// Lower-cased tag keys to drop, applied after the allow-list.
    #[serde(deserialize_with = "lenient_key_set")]
    pub excluded_tag_keys: BTreeSet<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub include_rules: bool,
    #[serde(deserialize_with = "lenient_enum")]
    pub message_kind: MessageKind,
    #[serde(deserialize_with = "lenient_enum")]
    pub language: Language,
    #[serde(deserialize_with = "lenient_number")]
    pub timeout_secs: Option<u64>,
    #[serde(deserialize_with = "lenient_number")]
    pub max_attempts: Option<u32>,
    #[serde(deserialize_with = "lenient_number")]
    pub retry_backoff_ms: Option<u64>,
    #[serde(deserialize_with = "lenient_proxy")]
    pub proxy: Option<ProxyConfig>,
}

impl ProjectConfig {
    /// Build a config pointing at `webhook` with every option at its default.
    pub fn new(webhook: impl Into<String>) -> Self {
        Self {
            webhook: webhook.into(),
            ..Default::default()
        }
    }

    /// Parse the host's option map (a JSON object keyed by option name).
    pub fn from_options(options: &serde_json::Value) -> CoreResult<Self> {
        if !options.is_object() && !options.is_null() {
            return Err(CoreError::config("plugin options must be a JSON object"));
        }
        if options.is_null() {
            return Ok(Self::default());
        }
        Ok(Self::deserialize(options)?)
    }

    /// Whether the webhook option is set. Unconfigured projects are skipped.
    pub fn is_configured(&self) -> bool {
        !self.webhook.trim().is_empty()
    }

    pub fn webhook_url(&self) -> &str {
        self.webhook.trim()
    }

    pub fn signing_secret(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn title_template(&self) -> TitleTemplate {
        TitleTemplate {
            keyword: self.custom_keyword.clone(),
            message: self.custom_message.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS))
    }

    /// Check the options are usable for delivery.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.is_configured() {
            return Err(CoreError::config("webhook is required"));
        }

        let url = url::Url::parse(self.webhook_url())
            .map_err(|e| CoreError::validation(format!("invalid webhook URL: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CoreError::validation(format!(
                "webhook must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.timeout_secs == Some(0) {
            return Err(CoreError::validation("timeout_secs must be greater than 0"));
        }

        Ok(())
    }
}

impl fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("webhook", &self.webhook)
            .field("custom_keyword", &self.custom_keyword)
            .field("custom_message", &self.custom_message)
            .field("signature", &self.signature.as_ref().map(|_| "<redacted>"))
            .field("include_tags", &self.include_tags)
            .field("included_tag_keys", &self.included_tag_keys)
            .field("excluded_tag_keys", &self.excluded_tag_keys)
            .field("include_rules", &self.include_rules)
            .field("message_kind", &self.message_kind)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Split a comma-separated option into a set of trimmed, lower-cased keys.
pub fn parse_tag_keys(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Enum option by name, case-insensitive. Unknown names fall back to the default.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let name = match value {
        serde_json::Value::Null => return Ok(T::default()),
        serde_json::Value::String(ref s) => s.trim().to_string(),
        ref other => {
            tracing::warn!(value = %other, "Ignoring non-string enum option");
            return Ok(T::default());
        }
    };
    if name.is_empty() {
        return Ok(T::default());
    }

    let parsed = serde_json::from_value(serde_json::Value::String(name.clone()))
        .or_else(|_| serde_json::from_value(serde_json::Value::String(name.to_lowercase())));
    Ok(parsed.unwrap_or_else(|_| {
        tracing::warn!(value = %name, "Unknown option value, using default");
        T::default()
    }))
}

fn lenient_proxy<'de, D>(deserializer: D) -> Result<Option<ProxyConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(proxy) => Ok(Some(proxy)),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed proxy option");
            Ok(None)
        }
    }
}

/// Non-negative integer option, as a JSON number or a numeric string.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let raw = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(ref n) => n.as_u64(),
        serde_json::Value::String(ref s) if s.trim().is_empty() => return Ok(None),
        serde_json::Value::String(ref s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    let parsed = raw.and_then(|n| T::try_from(n).ok());
    if parsed.is_none() {
        tracing::warn!(value = %value, "Ignoring unparseable numeric option");
    }
    Ok(parsed)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "on" | "1" | "yes"
        ),
        _ => false,
    })
}

fn lenient_key_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => parse_tag_keys(&s),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .flat_map(parse_tag_keys)
            .collect(),
        _ => BTreeSet::new(),
    })
}
