//! Static Host Adapter
//!
//! A `HostContext` backed by nothing more than the host's public base URL.
//! It follows Sentry's URL layout and tag conventions, which is enough for
//! hosts without a tag store and for tests.

use std::collections::HashMap;

use sentry_dingtalk_core::{Group, HostContext};

use crate::services::webhook::types::WebhookError;

/// Prefix the host puts on its built-in tag keys (`sentry:user`, `sentry:release`).
const RESERVED_TAG_PREFIX: &str = "sentry:";

#[derive(Debug, Clone)]
pub struct StaticHost {
    /// Base URL without a trailing slash.
    base_url: String,
    tag_labels: HashMap<String, String>,
}

impl StaticHost {
    pub fn new(base_url: &str) -> Result<Self, WebhookError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| WebhookError::InvalidConfig(format!("invalid host URL {}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(WebhookError::InvalidConfig(format!(
                "host URL cannot be a base: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tag_labels: HashMap::new(),
        })
    }

    /// Display `label` instead of `key` for this tag.
    pub fn with_tag_label(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.tag_labels.insert(key.into(), label.into());
        self
    }
}

impl HostContext for StaticHost {
    fn tag_key_label(&self, key: &str) -> String {
        self.tag_labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn standardized_key(&self, key: &str) -> String {
        key.strip_prefix(RESERVED_TAG_PREFIX).unwrap_or(key).to_string()
    }

    fn absolute_uri(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn group_absolute_url(&self, group: &Group, params: &[(&str, &str)]) -> String {
        let path = format!(
            "/organizations/{}/issues/{}/",
            group.organization.slug, group.id
        );
        let mut url = self.absolute_uri(&path);
        if !params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}
