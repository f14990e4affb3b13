//! The bridge against a mock Bot API server.

mod common;

use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

use common::{test_config, OPERATOR_CHAT};
use tether_channel::{Bridge, Question, ReplyOutcome};

async fn mock_send(server: &MockServer) {
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/bot123:test-token/sendMessage"))
        .and(matchers::body_partial_json(json!({
            "chat_id": OPERATOR_CHAT,
            "parse_mode": "MarkdownV2",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "result": {"message_id": 1}})),
        )
        .mount(server)
        .await;
}

fn bridge_for(server: &MockServer, base: &std::path::Path) -> Bridge {
    let mut config = test_config();
    config.telegram.api_base = server.uri();
    Bridge::from_config(config, base)
}

#[tokio::test]
async fn question_answered_over_http() {
    let server = MockServer::start().await;
    mock_send(&server).await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/bot123:test-token/getUpdates"))
        .and(matchers::body_partial_json(json!({"timeout": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": []})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/bot123:test-token/getUpdates"))
        .and(matchers::body_partial_json(json!({"offset": 1, "allowed_updates": ["message"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [{
                "update_id": 41,
                "message": {"message_id": 9, "chat": {"id": OPERATOR_CHAT}, "text": "Use REST"}
            }]
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let bridge = bridge_for(&server, tmp.path());

    let outcome = bridge
        .ask(&Question::new("Which API style?"), None)
        .await
        .unwrap();

    assert_eq!(outcome, ReplyOutcome::Answered("Use REST".into()));
    assert_eq!(bridge.offset().get(), 41);
    assert_eq!(
        bridge.pending_answer().take().unwrap().as_deref(),
        Some("Use REST")
    );
}

#[tokio::test]
async fn identify_reads_get_me() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/bot123:test-token/getMe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"id": 77, "is_bot": true, "first_name": "Tether", "username": "tether_bot"}
        })))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let bot = bridge_for(&server, tmp.path()).identify().await.unwrap();
    assert_eq!(bot.handle(), "@tether_bot");
}
