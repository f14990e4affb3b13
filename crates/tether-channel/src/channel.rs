//! Core transport trait and types for the messaging channel.
//!
//! A [`Transport`] performs the three raw operations the bridge needs from a
//! chat platform: send a message, long-poll for inbound updates, and report
//! the bot's identity. Retry policy lives inside the implementation so that
//! callers only ever see a final success or failure.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),

    #[error("telegram is not configured (missing token/chat id or disabled)")]
    NotConfigured,

    #[error(transparent)]
    State(#[from] crate::state::StateError),
}

/// Text formatting applied by the platform when rendering a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram MarkdownV2; reserved characters must be escaped.
    MarkdownV2,
    /// No formatting.
    Plain,
}

impl ParseMode {
    /// Value for the Bot API `parse_mode` field.
    pub fn as_api_str(self) -> Option<&'static str> {
        match self {
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Plain => None,
        }
    }
}

/// One inbound update, reduced to what the bridge acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub update_id: i64,
    /// Chat the message came from; `None` for non-message updates.
    pub chat_id: Option<i64>,
    pub text: Option<String>,
}

impl InboundUpdate {
    /// Trimmed message text, if there is any.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// The bot account behind a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl BotIdentity {
    /// `@username` when the bot has one, its first name otherwise.
    pub fn handle(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => self.first_name.clone(),
        }
    }
}

/// Raw access to the messaging platform for a single chat.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to the configured chat, retrying transient failures.
    async fn send(&self, text: &str, mode: ParseMode) -> Result<(), ChannelError>;

    /// Long-poll for updates with id `>= offset`, waiting up to `wait_secs`.
    async fn poll(&self, offset: i64, wait_secs: u64) -> Result<Vec<InboundUpdate>, ChannelError>;

    /// Fetch the bot identity (connectivity check).
    async fn identify(&self) -> Result<BotIdentity, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_text_is_trimmed_and_empty_is_none() {
        let update = InboundUpdate {
            update_id: 1,
            chat_id: Some(1),
            text: Some("  Use REST \n".into()),
        };
        assert_eq!(update.text(), Some("Use REST"));

        let blank = InboundUpdate {
            text: Some("   ".into()),
            ..update.clone()
        };
        assert_eq!(blank.text(), None);

        let none = InboundUpdate { text: None, ..update };
        assert_eq!(none.text(), None);
    }

    #[test]
    fn parse_mode_api_value() {
        assert_eq!(ParseMode::MarkdownV2.as_api_str(), Some("MarkdownV2"));
        assert_eq!(ParseMode::Plain.as_api_str(), None);
    }

    #[test]
    fn bot_handle_prefers_username() {
        let mut bot = BotIdentity {
            id: 7,
            first_name: "Loop Bot".into(),
            username: Some("loop_bot".into()),
        };
        assert_eq!(bot.handle(), "@loop_bot");
        bot.username = None;
        assert_eq!(bot.handle(), "Loop Bot");
    }
}
