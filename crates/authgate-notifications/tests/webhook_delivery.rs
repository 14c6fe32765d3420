use std::time::Duration;

use authgate_auth::{AlertError, SecurityAlerter, TokenReuseEvent};
use authgate_notifications::adapters::webhook::{EVENT_HEADER, SIGNATURE_HEADER};
use authgate_notifications::{WebhookAlerter, WebhookConfig, sign_payload};
use time::OffsetDateTime;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event() -> TokenReuseEvent {
    TokenReuseEvent {
        user_id: Uuid::new_v4(),
        ip: "203.0.113.9".to_string(),
        user_agent: "attacker/1.0".to_string(),
        detected_at: OffsetDateTime::now_utc(),
        token_id: Uuid::new_v4(),
    }
}

fn alerter(server: &MockServer, secret: Option<&str>, timeout: Duration) -> WebhookAlerter {
    WebhookAlerter::new(WebhookConfig {
        url: format!("{}/alerts", server.uri()).parse().unwrap(),
        secret: secret.map(str::to_string),
        timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn delivers_signed_event() {
    let server = MockServer::start().await;
    let event = event();
    let body = serde_json::to_vec(&event).unwrap();
    let signature = format!("sha256={}", sign_payload(&body, "s3cret").unwrap());

    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(header(SIGNATURE_HEADER, signature.as_str()))
        .and(header(EVENT_HEADER, "token_reuse_detected"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    alerter(&server, Some("s3cret"), Duration::from_secs(5))
        .notify(&event)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let received: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(received["userId"], event.user_id.to_string());
    assert_eq!(received["ip"], "203.0.113.9");
    assert_eq!(received["userAgent"], "attacker/1.0");
    assert_eq!(received["tokenId"], event.token_id.to_string());
    assert!(received["detectedAt"].is_string());
}

#[tokio::test]
async fn unsigned_without_secret() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    alerter(&server, None, Duration::from_secs(5))
        .notify(&event())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key(SIGNATURE_HEADER));
}

#[tokio::test]
async fn non_success_status_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = alerter(&server, None, Duration::from_secs(5))
        .notify(&event())
        .await
        .unwrap_err();
    assert!(matches!(err, AlertError::Rejected { status: 500 }));
}

#[tokio::test]
async fn slow_receiver_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = alerter(&server, None, Duration::from_millis(100))
        .notify(&event())
        .await
        .unwrap_err();
    assert!(matches!(err, AlertError::Delivery(_)));
}
