//! Ask the operator a question and wait for the answer.
//!
//! The wait is a bounded loop of long-poll sub-waits. Every observed update
//! advances the offset before it is inspected, so a rejected or ignored
//! message is never seen again. The waiter also remembers the highest id it
//! has seen, so a failed offset write cannot replay updates within one wait.
//! The first authorized message ends the wait; later updates from the same
//! batch stay queued for the command listener.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::{ChannelError, InboundUpdate, Transport};
use crate::commands::{self, Command, CommandDispatcher};
use crate::format;
use crate::notifier::{Delivery, Notifier, SuppressReason};
use crate::state::{OffsetStore, PendingAnswer};

/// Default length of one long-poll sub-wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default time to wait for an answer.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const HEARTBEAT_EVERY: Duration = Duration::from_secs(5 * 60);
const INITIAL_ERROR_BACKOFF: Duration = Duration::from_secs(1);
const MAX_ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// A question for the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub context: Option<String>,
    pub loop_number: Option<u64>,
    /// Overrides the waiter's default timeout.
    pub timeout: Option<Duration>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// How a wait ended. None of these is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The operator replied; the text is also stored as the pending answer.
    Answered(String),
    /// The operator sent `/skip`.
    Skipped,
    /// No authorized reply before the deadline.
    TimedOut,
    /// The cancellation signal was raised.
    Cancelled,
    /// The question was not sent (kind disabled or quiet hours).
    Suppressed(SuppressReason),
}

impl ReplyOutcome {
    /// The answer text; empty for every outcome except `Answered`.
    pub fn answer(&self) -> &str {
        match self {
            ReplyOutcome::Answered(text) => text,
            _ => "",
        }
    }
}

/// Failures that prevent a question from being asked at all.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("question text is empty")]
    EmptyQuestion,

    #[error("telegram is not configured")]
    NotConfigured,

    #[error("failed to send question: {0}")]
    SendFailed(#[source] ChannelError),
}

/// Sends a question and waits for the operator's reply.
pub struct ReplyWaiter<'a> {
    notifier: &'a Notifier,
    offset: &'a OffsetStore,
    answer: &'a PendingAnswer,
    commands: Option<&'a CommandDispatcher>,
    chat_id: i64,
    poll_interval: Duration,
    default_timeout: Duration,
    cancel: Option<watch::Receiver<bool>>,
    last_seen: AtomicI64,
}

impl<'a> ReplyWaiter<'a> {
    /// Only messages from `chat_id` can answer.
    pub fn new(
        notifier: &'a Notifier,
        offset: &'a OffsetStore,
        answer: &'a PendingAnswer,
        chat_id: i64,
    ) -> Self {
        Self {
            notifier,
            offset,
            answer,
            commands: None,
            chat_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_REPLY_TIMEOUT,
            cancel: None,
            last_seen: AtomicI64::new(0),
        }
    }

    /// Run recognized commands other than `/skip` that arrive mid-wait
    /// instead of taking them as the answer. Unrecognized `/...` text is
    /// still an answer.
    #[must_use]
    pub fn with_commands(mut self, commands: &'a CommandDispatcher) -> Self {
        self.commands = Some(commands);
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_secs(1));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// End the wait early with [`ReplyOutcome::Cancelled`] once the value
    /// becomes `true`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn ask(&self, question: &Question) -> Result<ReplyOutcome, AskError> {
        if question.text.trim().is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        let transport = self.notifier.transport().ok_or(AskError::NotConfigured)?;
        let timeout = question.timeout.unwrap_or(self.default_timeout);
        let timeout_minutes = timeout.as_secs().div_ceil(60).max(1);

        let sent = self
            .notifier
            .send_question(
                &question.text,
                question.context.as_deref(),
                question.loop_number,
                timeout_minutes,
            )
            .await;
        match sent {
            Ok(Delivery::Sent) => {
                info!(timeout_minutes, "question sent, waiting for reply");
            }
            Ok(Delivery::Suppressed(reason)) => {
                info!(?reason, "question not sent");
                return Ok(ReplyOutcome::Suppressed(reason));
            }
            Err(ChannelError::NotConfigured) => return Err(AskError::NotConfigured),
            Err(e) => return Err(AskError::SendFailed(e)),
        }

        let mut cancel = self.cancel.clone();
        self.drain_stale(transport.as_ref()).await;
        self.wait(transport.as_ref(), timeout, &mut cancel).await
    }

    /// Consume whatever was queued before the question went out.
    async fn drain_stale(&self, transport: &dyn Transport) {
        match transport.poll(self.next_offset(), 0).await {
            Ok(updates) => {
                if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                    debug!(count = updates.len(), "discarding queued updates");
                    self.advance(last);
                }
            }
            Err(e) => warn!(error = %e, "could not drain queued updates"),
        }
    }

    async fn wait(
        &self,
        transport: &dyn Transport,
        timeout: Duration,
        cancel: &mut Option<watch::Receiver<bool>>,
    ) -> Result<ReplyOutcome, AskError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut next_heartbeat = HEARTBEAT_EVERY;
        let mut backoff = INITIAL_ERROR_BACKOFF;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(self.timed_out(timeout).await);
            }
            let elapsed = now - started;
            if elapsed >= next_heartbeat {
                let remaining_minutes = (deadline - now).as_secs().div_ceil(60);
                info!(remaining_minutes, "still waiting for reply");
                while next_heartbeat <= elapsed {
                    next_heartbeat += HEARTBEAT_EVERY;
                }
            }

            let remaining = deadline - now;
            let wait_secs = self
                .poll_interval
                .min(remaining)
                .as_secs()
                .max(1);
            let polled = cancellable(
                cancel,
                transport.poll(self.next_offset(), wait_secs),
            )
            .await;
            let updates = match polled {
                None => return Ok(self.cancelled()),
                Some(Ok(updates)) => {
                    backoff = INITIAL_ERROR_BACKOFF;
                    updates
                }
                Some(Err(e)) => {
                    let pause = backoff.min(deadline.saturating_duration_since(Instant::now()));
                    warn!(
                        error = %e,
                        retry_in_secs = pause.as_secs_f32(),
                        "poll failed while waiting for reply"
                    );
                    if cancellable(cancel, tokio::time::sleep(pause)).await.is_none() {
                        return Ok(self.cancelled());
                    }
                    backoff = (backoff * 2).min(MAX_ERROR_BACKOFF);
                    continue;
                }
            };

            for update in updates {
                if let Some(outcome) = self.consider(&update).await {
                    return Ok(outcome);
                }
            }
        }
    }

    /// Consume one update; `Some` when it ends the wait.
    async fn consider(&self, update: &InboundUpdate) -> Option<ReplyOutcome> {
        if update.update_id <= self.last_seen.load(Ordering::Relaxed) {
            debug!(update_id = update.update_id, "skipping update seen earlier");
            return None;
        }
        self.advance(update.update_id);

        if update.chat_id != Some(self.chat_id) {
            warn!(
                update_id = update.update_id,
                chat_id = ?update.chat_id,
                "ignoring message from unauthorized chat"
            );
            return None;
        }
        let text = update.text()?;

        match (commands::parse(text), self.commands) {
            (Some(Command::Skip), _) => Some(self.skipped().await),
            (Some(Command::Unknown(_)), _) => Some(self.answered(text).await),
            (Some(command), Some(dispatcher)) => {
                let reply = dispatcher.execute(&command);
                self.reply_best_effort(&reply).await;
                None
            }
            _ => Some(self.answered(text).await),
        }
    }

    async fn answered(&self, text: &str) -> ReplyOutcome {
        info!(chars = text.chars().count(), "reply received");
        if let Err(e) = self.answer.store(text) {
            warn!(error = %e, "could not persist answer");
        }
        self.reply_best_effort(&format::answer_received(text)).await;
        ReplyOutcome::Answered(text.to_string())
    }

    async fn skipped(&self) -> ReplyOutcome {
        info!("question skipped by operator");
        if let Err(e) = self.answer.clear() {
            warn!(error = %e, "could not clear stale answer");
        }
        self.reply_best_effort(&format::skip_acknowledged()).await;
        ReplyOutcome::Skipped
    }

    async fn timed_out(&self, timeout: Duration) -> ReplyOutcome {
        let minutes = timeout.as_secs().div_ceil(60).max(1);
        info!(timeout_minutes = minutes, "no reply before timeout");
        self.reply_best_effort(&format::reply_timed_out(minutes)).await;
        if let Err(e) = self.answer.clear() {
            warn!(error = %e, "could not clear stale answer");
        }
        ReplyOutcome::TimedOut
    }

    fn cancelled(&self) -> ReplyOutcome {
        info!("wait for reply cancelled");
        ReplyOutcome::Cancelled
    }

    /// Poll offset from the stored cursor or the highest id seen here,
    /// whichever is further along.
    fn next_offset(&self) -> i64 {
        self.offset
            .get()
            .max(self.last_seen.load(Ordering::Relaxed))
            .saturating_add(1)
    }

    fn advance(&self, update_id: i64) {
        self.last_seen.fetch_max(update_id, Ordering::Relaxed);
        if let Err(e) = self.offset.advance(update_id) {
            warn!(error = %e, update_id, "could not persist update offset");
        }
    }

    async fn reply_best_effort(&self, text: &str) {
        if let Err(e) = self.notifier.send_reply(text).await {
            warn!(error = %e, "could not send reply to operator");
        }
    }
}

/// Run `fut` unless `cancel` is raised first; `None` means cancelled.
async fn cancellable<F: Future>(
    cancel: &mut Option<watch::Receiver<bool>>,
    fut: F,
) -> Option<F::Output> {
    let Some(rx) = cancel.as_mut() else {
        return Some(fut.await);
    };
    tokio::select! {
        biased;
        () = raised(rx) => None,
        out = fut => Some(out),
    }
}

async fn raised(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}
