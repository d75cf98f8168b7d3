//! Context Extraction
//!
//! Pulls the title, tag labels, issue link and triggering rule out of a host
//! notification. The is-configured gate runs in `NotifyService::notify` before
//! this is reached, so extraction always has a target.

use sentry_dingtalk_core::{Event, Group, HostContext, Notification, Rule};

use super::types::{NotificationRequest, TriggeringRule};

/// Referrer attached to issue links so the host can attribute clicks.
pub const REFERRER: &str = "dingtalk";

pub fn extract(notification: &Notification, host: &dyn HostContext) -> NotificationRequest {
    let event = &notification.event;
    let group = &event.group;

    NotificationRequest {
        project: group.project.full_name().to_string(),
        event_title: event.title.clone(),
        tags: resolve_tags(event, host),
        issue_url: host.group_absolute_url(group, &[("referrer", REFERRER)]),
        triggering_rule: notification
            .triggering_rule()
            .map(|rule| TriggeringRule {
                label: rule.label.clone(),
                settings_url: host.absolute_uri(&rule_settings_path(group, rule)),
            }),
    }
}

/// Replace raw tag keys and values with the host's display labels.
fn resolve_tags(event: &Event, host: &dyn HostContext) -> Vec<(String, String)> {
    event
        .tags
        .iter()
        .map(|(key, value)| (host.tag_key_label(key), host.tag_value_label(key, value)))
        .collect()
}

/// Host-relative path of the alert rule's settings page.
pub fn rule_settings_path(group: &Group, rule: &Rule) -> String {
    format!(
        "/{}/{}/settings/alerts/rules/{}/",
        group.organization.slug, group.project.slug, rule.id
    )
}
