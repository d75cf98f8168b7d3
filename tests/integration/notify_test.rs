//! Notification Pipeline Integration Tests
//!
//! Runs `NotifyService` with a `StaticHost` against a mock robot endpoint.

use std::sync::Arc;
use std::time::Duration;

use sentry_dingtalk::{
    dispatch_on_event, DeliveryStatus, Event, Group, NotifyResult, NotifyService, Notification,
    Organization, Project, ProjectConfig, Rule, SkipReason, StaticHost, WebhookError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service() -> NotifyService {
    let host = StaticHost::new("https://sentry.example.com/")
        .unwrap()
        .with_tag_label("sentry:user", "user");
    NotifyService::new(Arc::new(host)).unwrap()
}

fn notification(project_slug: &str) -> Notification {
    Notification::new(Event {
        title: "TypeError: x is undefined".to_string(),
        tags: vec![
            ("environment".to_string(), "prod".to_string()),
            ("sentry:user".to_string(), "id:42".to_string()),
            ("level".to_string(), "error".to_string()),
        ],
        group: Group {
            id: 7,
            project: Project {
                slug: project_slug.to_string(),
                name: String::new(),
            },
            organization: Organization {
                slug: "acme".to_string(),
            },
        },
    })
}

async fn robot_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errcode":0,"errmsg":"ok"}"#))
        .mount(&mock_server)
        .await;
    mock_server
}

fn webhook(mock_server: &MockServer) -> String {
    format!("{}/robot/send?access_token=abc", mock_server.uri())
}

async fn markdown_text(mock_server: &MockServer) -> String {
    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    body["markdown"]["text"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_unconfigured_project_sends_nothing() {
    let mock_server = robot_server().await;

    let result = service()
        .notify(&notification("web"), &ProjectConfig::new("   "), true)
        .await
        .unwrap();

    assert!(matches!(
        result,
        NotifyResult::Skipped(SkipReason::ConfigurationMissing)
    ));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_minimal_markdown_message() {
    let mock_server = robot_server().await;
    let config = ProjectConfig::new(webhook(&mock_server));

    let result = service()
        .notify(&notification("web"), &config, false)
        .await
        .unwrap();

    let record = result.record().unwrap();
    assert_eq!(record.status, DeliveryStatus::Success);
    assert_eq!(record.status_code, Some(200));
    assert_eq!(record.attempts, 1);
    assert_eq!(record.project, "web");
    assert_eq!(record.message_kind, "markdown");

    assert_eq!(
        markdown_text(&mock_server).await,
        "TypeError: x is undefined\n> #### [issue](https://sentry.example.com/organizations/acme/issues/7/?referrer=dingtalk)"
    );
}

#[tokio::test]
async fn test_full_markdown_message_from_options() {
    let mock_server = robot_server().await;
    let options = serde_json::json!({
        "webhook": webhook(&mock_server),
        "custom_keyword": "alert",
        "custom_message": "on call",
        "include_tags": "on",
        "included_tag_keys": "Environment, user",
        "include_rules": true,
        "language": "en",
    });
    let config = ProjectConfig::from_options(&options).unwrap();
    let notification = notification("web").with_rule(Rule {
        id: 42,
        label: "High error rate".to_string(),
    });

    service().notify(&notification, &config, true).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["markdown"]["title"],
        "[alert] TypeError: x is undefined (on call)"
    );
    assert_eq!(
        markdown_text(&mock_server).await,
        concat!(
            "[alert] TypeError: x is undefined (on call)",
            "\n> Triggered by alert rule [High error rate](https://sentry.example.com/acme/web/settings/alerts/rules/42/)",
            "\n> #### [issue](https://sentry.example.com/organizations/acme/issues/7/?referrer=dingtalk)",
            "\n> ###### environment:prod",
            "\n> ###### user:id:42",
        )
    );
}

#[tokio::test]
async fn test_action_card_message_has_no_issue_section() {
    let mock_server = robot_server().await;
    let options = serde_json::json!({
        "webhook": webhook(&mock_server),
        "include_tags": true,
        "excluded_tag_keys": "level",
        "message_kind": "action_card",
    });
    let config = ProjectConfig::from_options(&options).unwrap();

    service()
        .notify(&notification("web"), &config, true)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["msgtype"], "actionCard");
    assert_eq!(
        body["actionCard"]["text"],
        "TypeError: x is undefined\n\n- environment:prod\n- user:id:42"
    );
    assert_eq!(
        body["actionCard"]["singleURL"],
        "https://sentry.example.com/organizations/acme/issues/7/?referrer=dingtalk"
    );
}

#[tokio::test]
async fn test_retry_after_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut config = ProjectConfig::new(webhook(&mock_server));
    config.timeout_secs = Some(1);
    config.max_attempts = Some(2);
    config.retry_backoff_ms = Some(10);

    let result = service()
        .notify(&notification("web"), &config, true)
        .await
        .unwrap();

    let record = result.record().unwrap();
    assert_eq!(record.status, DeliveryStatus::Success);
    assert_eq!(record.attempts, 2);
    assert!(record.error.is_none());
}

#[tokio::test]
async fn test_unreachable_webhook_failure_modes() {
    // Nothing listens on the discard port.
    let config = ProjectConfig::new("http://127.0.0.1:9/robot/send");

    let result = service()
        .notify(&notification("web"), &config, false)
        .await
        .unwrap();
    let record = result.record().unwrap();
    assert_eq!(record.status, DeliveryStatus::Failed);
    assert!(record.error.is_some());

    let raised = service().notify(&notification("web"), &config, true).await;
    assert!(matches!(raised, Err(WebhookError::DeliveryFailed(_))));
}

#[tokio::test]
async fn test_test_configuration_reports_success() {
    let mock_server = robot_server().await;
    let config = ProjectConfig::new(webhook(&mock_server));

    let result = service().test_configuration(&config).await.unwrap();
    assert!(result.success);
    assert!(result.latency_ms.is_some());
    assert!(result.error.is_none());

    let text = markdown_text(&mock_server).await;
    assert!(text.starts_with("Test notification from Sentry"));
}

#[tokio::test]
async fn test_test_configuration_rejects_invalid_config() {
    let result = service()
        .test_configuration(&ProjectConfig::new("ftp://robot.example.com"))
        .await;
    assert!(matches!(result, Err(WebhookError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_slow_project_does_not_block_others() {
    let slow_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&slow_server)
        .await;
    let fast_server = robot_server().await;

    let service = Arc::new(service());
    let slow = dispatch_on_event(
        service.clone(),
        notification("slow"),
        ProjectConfig::new(webhook(&slow_server)),
    );
    let fast = dispatch_on_event(
        service.clone(),
        notification("fast"),
        ProjectConfig::new(webhook(&fast_server)),
    );

    let fast_record = tokio::time::timeout(Duration::from_secs(2), fast)
        .await
        .expect("fast project delivery was blocked")
        .unwrap()
        .unwrap();
    assert_eq!(fast_record.project, "fast");
    assert_eq!(fast_record.status, DeliveryStatus::Success);

    let slow_record = slow.await.unwrap().unwrap();
    assert_eq!(slow_record.status, DeliveryStatus::Success);
}
