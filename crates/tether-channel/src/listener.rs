//! One command-polling cycle outside of a question.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::ChannelError;
use crate::commands::{Command, CommandDispatcher, DispatchOutcome};
use crate::format;
use crate::notifier::Notifier;
use crate::state::OffsetStore;

/// What one [`CommandListener::poll_once`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenReport {
    /// Updates received and consumed.
    pub updates: usize,
    /// Commands executed, in arrival order.
    pub commands: Vec<Command>,
    /// Updates dropped for an unauthorized chat or missing text.
    pub ignored: usize,
}

/// Polls once and routes whatever arrived.
pub struct CommandListener<'a> {
    notifier: &'a Notifier,
    offset: &'a OffsetStore,
    dispatcher: &'a CommandDispatcher,
    chat_id: i64,
}

impl<'a> CommandListener<'a> {
    pub fn new(
        notifier: &'a Notifier,
        offset: &'a OffsetStore,
        dispatcher: &'a CommandDispatcher,
        chat_id: i64,
    ) -> Self {
        Self {
            notifier,
            offset,
            dispatcher,
            chat_id,
        }
    }

    /// Long-poll for up to `wait` and handle every update received.
    pub async fn poll_once(&self, wait: Duration) -> Result<ListenReport, ChannelError> {
        let transport = self.notifier.transport().ok_or(ChannelError::NotConfigured)?;
        let updates = transport
            .poll(self.offset.next_poll_offset(), wait.as_secs())
            .await?;

        let mut report = ListenReport {
            updates: updates.len(),
            ..Default::default()
        };
        for update in updates {
            self.offset.advance(update.update_id)?;

            if update.chat_id != Some(self.chat_id) {
                warn!(
                    update_id = update.update_id,
                    chat_id = ?update.chat_id,
                    "ignoring message from unauthorized chat"
                );
                report.ignored += 1;
                continue;
            }
            let Some(text) = update.text() else {
                debug!(update_id = update.update_id, "skipping update without text");
                report.ignored += 1;
                continue;
            };

            let reply = match self.dispatcher.dispatch(text) {
                DispatchOutcome::Handled { command, reply } => {
                    report.commands.push(command);
                    reply
                }
                DispatchOutcome::NotCommand => {
                    info!("free text with no question pending");
                    format::no_pending_question()
                }
            };
            if let Err(e) = self.notifier.send_reply(&reply).await {
                warn!(error = %e, "could not send command reply");
            }
        }
        Ok(report)
    }
}
