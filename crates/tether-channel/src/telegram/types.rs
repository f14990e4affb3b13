//! Serde types for the Telegram Bot API.
//!
//! Only the fields the bridge reads are deserialized; everything else in the
//! payload is ignored.

use serde::Deserialize;

use crate::channel::{BotIdentity, InboundUpdate};

/// Generic Telegram API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub description: Option<String>,
    pub result: Option<T>,
}

/// A Telegram Update object from `getUpdates`.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// A Telegram Message.
#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

/// A Telegram User (returned by `getMe`).
#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

/// A Telegram Chat.
#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Sent message result (only the id is needed).
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

impl From<Update> for InboundUpdate {
    fn from(update: Update) -> Self {
        let (chat_id, text) = match update.message {
            Some(msg) => (Some(msg.chat.id), msg.text),
            None => (None, None),
        };
        InboundUpdate {
            update_id: update.update_id,
            chat_id,
            text,
        }
    }
}

impl From<User> for BotIdentity {
    fn from(user: User) -> Self {
        BotIdentity {
            id: user.id,
            first_name: user.first_name,
            username: user.username,
        }
    }
}
