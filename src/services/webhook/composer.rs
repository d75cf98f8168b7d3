//! Message Composition
//!
//! Applies the project's options to an extracted request and builds the
//! markdown body. Sections are appended in a fixed order (rule, issue link,
//! tags); a section that is switched off or empty adds nothing.
//!
//! Markdown cards keep every line block-quoted, e.g.
//!
//! ```text
//! Error: Boom
//! > 由报警规则[High error rate](https://sentry.example.com/acme/web/settings/alerts/rules/42/)触发
//! > #### [issue](https://sentry.example.com/organizations/acme/issues/7/?referrer=dingtalk)
//! > ###### environment:prod
//! ```
//!
//! Action cards carry the issue link on their button instead and render tags
//! as a list.

use sentry_dingtalk_core::{HostContext, Language, MessageKind, ProjectConfig};

use super::types::{ComposedMessage, NotificationRequest, TriggeringRule};

pub fn compose(
    request: &NotificationRequest,
    config: &ProjectConfig,
    host: &dyn HostContext,
) -> ComposedMessage {
    let kind = config.message_kind;
    let mut body = String::new();

    if config.include_rules {
        if let Some(ref rule) = request.triggering_rule {
            body.push_str(&section(kind, &[rule_sentence(config.language, rule)]));
        }
    }

    if kind == MessageKind::Markdown {
        body.push_str(&section(kind, &[format!("#### [issue]({})", request.issue_url)]));
    }

    if config.include_tags {
        let lines = tag_lines(request, config, host);
        body.push_str(&section(kind, &lines));
    }

    tracing::debug!(
        project = %request.project,
        kind = %kind,
        body_len = body.len(),
        "Composed DingTalk message"
    );

    ComposedMessage {
        title: config.title_template().apply(&request.event_title),
        body,
        action_link: request.issue_url.clone(),
        message_kind: kind,
    }
}

/// Fixed sentence naming the rule that fired, with a link to its settings.
pub fn rule_sentence(language: Language, rule: &TriggeringRule) -> String {
    match language {
        Language::Zh => format!("由报警规则[{}]({})触发", rule.label, rule.settings_url),
        Language::En => format!(
            "Triggered by alert rule [{}]({})",
            rule.label, rule.settings_url
        ),
    }
}

/// Whether a tag passes the project's allow and deny lists.
///
/// `key` is matched lower-cased, and so is its standardized form.
pub fn tag_allowed(key: &str, config: &ProjectConfig, host: &dyn HostContext) -> bool {
    let key = key.to_lowercase();
    let std_key = host.standardized_key(&key).to_lowercase();

    let included = &config.included_tag_keys;
    if !included.is_empty() && !included.contains(&key) && !included.contains(&std_key) {
        return false;
    }

    let excluded = &config.excluded_tag_keys;
    !(excluded.contains(&key) || excluded.contains(&std_key))
}

fn tag_lines(
    request: &NotificationRequest,
    config: &ProjectConfig,
    host: &dyn HostContext,
) -> Vec<String> {
    let marker = match config.message_kind {
        MessageKind::Markdown => "######",
        MessageKind::ActionCard => "-",
    };

    request
        .tags
        .iter()
        .filter(|(key, _)| tag_allowed(key, config, host))
        .map(|(key, value)| format!("{} {}:{}", marker, key, value))
        .collect()
}

/// Render `lines` as one body section, or nothing when there are no lines.
///
/// Action-card sections open with a blank line; a single newline would fold
/// them into the preceding paragraph.
fn section(kind: MessageKind, lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    match kind {
        MessageKind::Markdown => lines.iter().map(|l| format!("\n> {}", l)).collect(),
        MessageKind::ActionCard => format!("\n\n{}", lines.join("\n")),
    }
}
