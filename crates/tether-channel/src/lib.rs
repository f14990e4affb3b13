//! Telegram bridge between an autonomous agent loop and its operator.
//!
//! Outbound, the loop pushes status, error and question notifications.
//! Inbound, the operator answers questions and sends slash commands that
//! pause, resume, reset or stop the loop through small state files.
//!
//! # Architecture
//!
//! - [`channel`]: the [`Transport`] trait and the types it exchanges
//! - [`telegram`]: Telegram Bot API transport with send retry
//! - [`state`]: offset, pending answer, control flags and host files
//! - [`gate`] and [`quiet_hours`]: send throttle and quiet-hours window
//! - [`format`]: MarkdownV2 message templates
//! - [`notifier`]: one entry point per notification kind
//! - [`reply`]: ask a question and wait for the answer
//! - [`commands`]: slash-command parsing and handlers
//! - [`listener`]: one command-polling cycle
//! - [`bridge`]: the context object tying it together

pub mod bridge;
pub mod channel;
pub mod commands;
pub mod format;
pub mod gate;
pub mod listener;
pub mod notifier;
pub mod quiet_hours;
pub mod reply;
pub mod state;
pub mod telegram;

pub use bridge::Bridge;
pub use channel::{BotIdentity, ChannelError, InboundUpdate, ParseMode, Transport};
pub use commands::{Command, CommandDispatcher, DispatchOutcome};
pub use listener::{CommandListener, ListenReport};
pub use notifier::{Delivery, Notifier, NotifyKind, SuppressReason};
pub use reply::{AskError, Question, ReplyOutcome, ReplyWaiter};
