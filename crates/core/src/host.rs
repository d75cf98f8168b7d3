//! Host Collaborator Interface
//!
//! The error-tracking host hands each notification over as plain data
//! (`Notification`) and answers a handful of read-only lookups through
//! `HostContext`. Nothing here talks to the host's stores directly, so the
//! notifier can be driven by a real host adapter or by stub data in tests.

use serde::{Deserialize, Serialize};

/// A single notification handed over by the host's dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub event: Event,
    /// Rules that fired for this event, in host order. Only the first is shown.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Notification {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The rule that triggered this notification, if any.
    pub fn triggering_rule(&self) -> Option<&Rule> {
        self.rules.first()
    }
}

/// Error event as seen by the plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    /// Raw `(key, value)` tag pairs. Keys may repeat at the source.
    #[serde(default)]
    pub tags: Vec<(String, String)>,
    pub group: Group,
}

/// Issue (group) the event belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub project: Project,
    pub organization: Organization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

impl Project {
    /// Display name, falling back to the slug.
    pub fn full_name(&self) -> &str {
        if self.name.is_empty() {
            &self.slug
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub slug: String,
}

/// Alert rule that triggered a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: u64,
    pub label: String,
}

/// Read-only lookups the host provides to the notifier.
///
/// Tag lookups default to pass-through so hosts without specialized labels
/// only need to implement the URL builders.
pub trait HostContext: Send + Sync {
    /// Human-readable label for a tag key.
    fn tag_key_label(&self, key: &str) -> String {
        key.to_string()
    }

    /// Human-readable label for a tag value.
    fn tag_value_label(&self, _key: &str, value: &str) -> String {
        value.to_string()
    }

    /// Canonical form of a tag key, used for allow/deny list matching.
    fn standardized_key(&self, key: &str) -> String {
        key.to_string()
    }

    /// Resolve a host-relative path (starting with `/`) to an absolute URL.
    fn absolute_uri(&self, path: &str) -> String;

    /// Absolute URL of the issue page for `group`, with query `params` attached.
    fn group_absolute_url(&self, group: &Group, params: &[(&str, &str)]) -> String;
}
