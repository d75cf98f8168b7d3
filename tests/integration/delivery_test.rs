//! Delivery Integration Tests
//!
//! Drives `DingtalkChannel` against a wiremock server and inspects the raw
//! requests it sends.

use std::time::Duration;

use sentry_dingtalk::services::webhook::signing;
use sentry_dingtalk::{
    ComposedMessage, DeliveryOutcome, DingtalkChannel, MessageKind, ProjectConfig, ProxyConfig,
    ProxyProtocol, WebhookChannel,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn channel() -> DingtalkChannel {
    DingtalkChannel::new(None, Duration::from_secs(5)).unwrap()
}

fn message(kind: MessageKind) -> ComposedMessage {
    ComposedMessage {
        title: "[alert] Error: Boom".to_string(),
        body: "\n> ###### environment:prod".to_string(),
        action_link: "https://sentry.example.com/organizations/acme/issues/7/?referrer=dingtalk"
            .to_string(),
        message_kind: kind,
    }
}

async fn robot_server(status: u16) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(serde_json::json!({"errcode": 0, "errmsg": "ok"})),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_markdown_delivery_posts_json_body() {
    let mock_server = robot_server(200).await;
    let config = ProjectConfig::new(format!("{}/robot/send?access_token=abc", mock_server.uri()));

    let outcome = channel().deliver(&message(MessageKind::Markdown), &config).await;
    assert_eq!(outcome, DeliveryOutcome::Success { status_code: 200 });

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert_eq!(request.url.query(), Some("access_token=abc"));
    assert_eq!(
        request.headers.get("content-type").unwrap().to_str().unwrap(),
        "application/json"
    );
    assert_eq!(
        request.headers.get("accept").unwrap().to_str().unwrap(),
        "text/plain"
    );

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["msgtype"], "markdown");
    assert_eq!(body["markdown"]["title"], "[alert] Error: Boom");
    assert_eq!(
        body["markdown"]["text"],
        "[alert] Error: Boom\n> ###### environment:prod"
    );
    assert!(body.get("actionCard").is_none());
}

#[tokio::test]
async fn test_action_card_delivery_carries_issue_button() {
    let mock_server = robot_server(200).await;
    let mut config = ProjectConfig::new(format!("{}/robot/send?access_token=abc", mock_server.uri()));
    config.message_kind = MessageKind::ActionCard;

    let outcome = channel().deliver(&message(MessageKind::ActionCard), &config).await;
    assert!(outcome.is_success());

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["msgtype"], "actionCard");
    assert_eq!(body["actionCard"]["btnOrientation"], "0");
    assert_eq!(body["actionCard"]["singleTitle"], "Visit Issue Link");
    assert_eq!(
        body["actionCard"]["singleURL"],
        "https://sentry.example.com/organizations/acme/issues/7/?referrer=dingtalk"
    );
    assert!(body.get("markdown").is_none());
}

#[tokio::test]
async fn test_signed_delivery_appends_timestamp_and_sign() {
    let mock_server = robot_server(200).await;
    let mut config = ProjectConfig::new(format!("{}/robot/send?access_token=abc", mock_server.uri()));
    config.signature = Some("SEC123".to_string());

    let outcome = channel().deliver(&message(MessageKind::Markdown), &config).await;
    assert!(outcome.is_success());

    let requests = mock_server.received_requests().await.unwrap();
    let pairs: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["access_token", "timestamp", "sign"]);

    let timestamp: i64 = pairs[1].1.parse().unwrap();
    assert!(timestamp > 1_600_000_000_000);

    // Decoded query value is the base64 signature for that timestamp.
    let expected = signing::compute_signature(timestamp, "SEC123").unwrap();
    assert_eq!(pairs[2].1, expected);
}

#[tokio::test]
async fn test_non_success_status_is_still_delivered() {
    let mock_server = robot_server(500).await;
    let config = ProjectConfig::new(format!("{}/robot/send", mock_server.uri()));

    let outcome = channel().deliver(&message(MessageKind::Markdown), &config).await;
    assert_eq!(outcome, DeliveryOutcome::Success { status_code: 500 });
}

#[tokio::test]
async fn test_timeout_is_retryable_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = ProjectConfig::new(format!("{}/robot/send", mock_server.uri()));
    config.timeout_secs = Some(1);

    let outcome = channel().deliver(&message(MessageKind::Markdown), &config).await;
    match outcome {
        DeliveryOutcome::Failure { retryable, .. } => assert!(retryable),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_project_proxy_carries_the_request() {
    // Plain HTTP proxy: the request goes to the proxy, the robot host is never resolved.
    let proxy_server = robot_server_any_path().await;
    let port = proxy_server.address().port();

    let mut config = ProjectConfig::new("http://robot.invalid/robot/send?access_token=abc");
    config.proxy = Some(ProxyConfig {
        protocol: ProxyProtocol::Http,
        host: "127.0.0.1".to_string(),
        port,
        username: None,
        password: None,
    });

    let outcome = channel().deliver(&message(MessageKind::Markdown), &config).await;
    assert_eq!(outcome, DeliveryOutcome::Success { status_code: 200 });

    let requests = proxy_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/robot/send");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["msgtype"], "markdown");
}

async fn robot_server_any_path() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    mock_server
}
