//! Raw HTTP calls to the Telegram Bot API.
//!
//! Wraps reqwest for `sendMessage`, `getUpdates` and `getMe`. Every call is
//! a single attempt; retries belong to [`TelegramTransport`](super::TelegramTransport).

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::channel::ChannelError;

use super::types::{ApiResponse, SentMessage, Update, User};

/// Local timeout for non-polling requests.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Extra local time granted to `getUpdates` on top of the remote long-poll
/// wait, so the local timeout never fires before the server answers.
pub const POLL_TIMEOUT_MARGIN_SECS: u64 = 10;

/// Low-level Telegram Bot API client.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client with a custom base URL (tests, local Bot API servers).
    pub fn with_base_url(bot_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/bot{}", base_url.trim_end_matches('/'), bot_token),
        }
    }

    /// Send a text message to a chat. Returns the sent message's id.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<i64, ChannelError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }

        debug!(chat_id, chars = text.chars().count(), "sendMessage");

        let resp = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await?;

        let api_resp: ApiResponse<SentMessage> = resp.json().await?;
        if !api_resp.ok {
            let desc = api_resp.description.unwrap_or_default();
            warn!("sendMessage failed: {desc}");
            return Err(ChannelError::Api(desc));
        }

        Ok(api_resp.result.map(|m| m.message_id).unwrap_or(0))
    }

    /// Long-poll for new updates.
    ///
    /// `offset` is the lowest update id to return; the server treats every
    /// update below it as acknowledged.
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, ChannelError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout,
            "allowed_updates": ["message"],
        });

        let resp = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .timeout(Duration::from_secs(timeout + POLL_TIMEOUT_MARGIN_SECS))
            .json(&body)
            .send()
            .await?;

        let api_resp: ApiResponse<Vec<Update>> = resp.json().await?;
        if !api_resp.ok {
            let desc = api_resp.description.unwrap_or_default();
            warn!("getUpdates failed: {desc}");
            return Err(ChannelError::Api(desc));
        }

        Ok(api_resp.result.unwrap_or_default())
    }

    /// Fetch the bot's own user record.
    pub async fn get_me(&self) -> Result<User, ChannelError> {
        let resp = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        let api_resp: ApiResponse<User> = resp.json().await?;
        if !api_resp.ok {
            let desc = api_resp.description.unwrap_or_default();
            warn!("getMe failed: {desc}");
            return Err(ChannelError::Api(desc));
        }

        api_resp
            .result
            .ok_or_else(|| ChannelError::Api("getMe returned no result".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_message_posts_chat_text_and_mode() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/bottest-token/sendMessage"))
            .and(matchers::body_partial_json(json!({
                "chat_id": 123456,
                "text": "hello",
                "parse_mode": "MarkdownV2",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": {"message_id": 77}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = TelegramApi::with_base_url("test-token", &server.uri());
        let id = api
            .send_message(123456, "hello", Some("MarkdownV2"))
            .await
            .unwrap();
        assert_eq!(id, 77);
    }

    #[tokio::test]
    async fn api_error_carries_description() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path_regex(r"/bot.*/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found",
            })))
            .mount(&server)
            .await;

        let api = TelegramApi::with_base_url("test-token", &server.uri());
        match api.send_message(1, "x", None).await {
            Err(ChannelError::Api(desc)) => assert!(desc.contains("chat not found")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_updates_sends_offset_and_timeout() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path_regex(r"/bot.*/getUpdates"))
            .and(matchers::body_partial_json(json!({"offset": 11, "timeout": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {"update_id": 11, "message": {"message_id": 1, "chat": {"id": 5}, "text": "hi"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = TelegramApi::with_base_url("test-token", &server.uri());
        let updates = api.get_updates(11, 0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 11);
    }

    #[tokio::test]
    async fn get_me_returns_user() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/bottest-token/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true, "first_name": "Loop", "username": "loop_bot"}
            })))
            .mount(&server)
            .await;

        let api = TelegramApi::with_base_url("test-token", &server.uri());
        let me = api.get_me().await.unwrap();
        assert_eq!(me.id, 42);
        assert_eq!(me.username.as_deref(), Some("loop_bot"));
    }
}
