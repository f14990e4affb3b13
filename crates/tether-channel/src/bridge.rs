//! The context object every bridge operation runs against.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use tether_types::{StatePaths, TetherConfig};

use crate::channel::{BotIdentity, ChannelError, Transport};
use crate::commands::CommandDispatcher;
use crate::listener::{CommandListener, ListenReport};
use crate::notifier::Notifier;
use crate::reply::{AskError, Question, ReplyOutcome, ReplyWaiter};
use crate::state::{ControlFlags, OffsetStore, PendingAnswer};
use crate::telegram::TelegramTransport;

/// Built once at process start from the loaded configuration. Owns the
/// transport, the notifier (and with it the send throttle) and the state
/// stores.
pub struct Bridge {
    config: TetherConfig,
    paths: StatePaths,
    chat_id: Option<i64>,
    notifier: Notifier,
    offset: OffsetStore,
    answer: PendingAnswer,
    dispatcher: CommandDispatcher,
}

impl Bridge {
    /// Connect to Telegram when the config has usable credentials; paths are
    /// resolved against `base`.
    pub fn from_config(config: TetherConfig, base: &Path) -> Self {
        let transport = config.telegram.credentials().map(|credentials| {
            Arc::new(TelegramTransport::new(&credentials, &config.telegram.api_base))
                as Arc<dyn Transport>
        });
        Self::with_transport(config, base, transport)
    }

    /// Use a caller-supplied transport. Messages are accepted only from the
    /// configured chat id.
    pub fn with_transport(
        config: TetherConfig,
        base: &Path,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let paths = StatePaths::resolve(base, &config.paths);
        debug!(configured = transport.is_some(), "bridge ready");
        Self {
            chat_id: config.telegram.chat_id,
            notifier: Notifier::from_config(transport, &config),
            offset: OffsetStore::new(&paths.offset),
            answer: PendingAnswer::new(&paths.pending_answer),
            dispatcher: CommandDispatcher::new(&paths),
            paths,
            config,
        }
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn is_configured(&self) -> bool {
        self.notifier.is_configured() && self.chat_id.is_some()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn offset(&self) -> &OffsetStore {
        &self.offset
    }

    pub fn pending_answer(&self) -> &PendingAnswer {
        &self.answer
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn flags(&self) -> &ControlFlags {
        self.dispatcher.flags()
    }

    /// Ask the operator and wait, using the configured poll interval and
    /// question timeout.
    pub async fn ask(
        &self,
        question: &Question,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<ReplyOutcome, AskError> {
        if question.text.trim().is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        let chat_id = self
            .chat_id
            .filter(|_| self.notifier.is_configured())
            .ok_or(AskError::NotConfigured)?;

        let mut waiter = ReplyWaiter::new(&self.notifier, &self.offset, &self.answer, chat_id)
            .with_commands(&self.dispatcher)
            .with_poll_interval(Duration::from_secs(self.config.telegram.poll_interval_secs))
            .with_timeout(Duration::from_secs(
                self.config.notify.question_timeout_minutes.saturating_mul(60),
            ));
        if let Some(cancel) = cancel {
            waiter = waiter.with_cancel(cancel);
        }
        waiter.ask(question).await
    }

    /// One command-listening cycle.
    pub async fn listen_once(&self, wait: Duration) -> Result<ListenReport, ChannelError> {
        let chat_id = self.chat_id.ok_or(ChannelError::NotConfigured)?;
        CommandListener::new(&self.notifier, &self.offset, &self.dispatcher, chat_id)
            .poll_once(wait)
            .await
    }

    /// Connectivity check.
    pub async fn identify(&self) -> Result<BotIdentity, ChannelError> {
        self.notifier
            .transport()
            .ok_or(ChannelError::NotConfigured)?
            .identify()
            .await
    }
}
