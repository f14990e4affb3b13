//! Telegram Bot API transport.
//!
//! [`TelegramTransport`] implements [`Transport`] for one chat on top of the
//! raw [`TelegramApi`], adding retry with quadratic backoff for sends.

pub mod api;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use tether_types::Credentials;

use crate::channel::{BotIdentity, ChannelError, InboundUpdate, ParseMode, Transport};

use self::api::TelegramApi;

/// How often and how patiently a send is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay unit; the pause after attempt `n` is `n² × base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Pause after a failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_mul(attempt)
    }
}

/// Telegram transport bound to a single chat.
pub struct TelegramTransport {
    api: TelegramApi,
    chat_id: i64,
    retry: RetryPolicy,
}

impl TelegramTransport {
    /// Create a transport for the given credentials against `api_base`.
    pub fn new(credentials: &Credentials, api_base: &str) -> Self {
        Self::with_api(
            TelegramApi::with_base_url(&credentials.bot_token, api_base),
            credentials.chat_id,
        )
    }

    /// Create with a custom API client (tests use a wiremock base URL).
    pub fn with_api(api: TelegramApi, chat_id: i64) -> Self {
        Self {
            api,
            chat_id,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, text: &str, mode: ParseMode) -> Result<(), ChannelError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self
                .api
                .send_message(self.chat_id, text, mode.as_api_str())
                .await
            {
                Ok(message_id) => {
                    debug!(message_id, attempt, "message delivered");
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = attempts,
                        delay_secs = delay.as_secs_f32(),
                        "send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(error = %e, attempts, "send failed, giving up");
                    return Err(e);
                }
            }
        }
    }

    async fn poll(&self, offset: i64, wait_secs: u64) -> Result<Vec<InboundUpdate>, ChannelError> {
        let updates = self.api.get_updates(offset, wait_secs).await?;
        Ok(updates.into_iter().map(InboundUpdate::from).collect())
    }

    async fn identify(&self) -> Result<BotIdentity, ChannelError> {
        Ok(self.api.get_me().await?.into())
    }
}
