//! Outbound notifications.
//!
//! Every notification kind has its own entry point; all of them funnel
//! through [`Notifier::deliver`], which applies the configured-check, the
//! per-kind enable flag, quiet hours and the send throttle in that order.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use tether_types::{NotifyConfig, TetherConfig};

use crate::channel::{ChannelError, ParseMode, Transport};
use crate::format::{self, LoopSummary, RateLimitInfo};
use crate::gate::Gate;

/// Notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Status,
    LoopComplete,
    Error,
    CircuitBreaker,
    RateLimit,
    Question,
    Startup,
    Shutdown,
    /// Replies to operator commands and answer acknowledgements.
    Reply,
}

impl NotifyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotifyKind::Status => "status",
            NotifyKind::LoopComplete => "loop_complete",
            NotifyKind::Error => "error",
            NotifyKind::CircuitBreaker => "circuit_breaker",
            NotifyKind::RateLimit => "rate_limit",
            NotifyKind::Question => "question",
            NotifyKind::Startup => "startup",
            NotifyKind::Shutdown => "shutdown",
            NotifyKind::Reply => "reply",
        }
    }

    /// Whether this kind is switched on. Kinds without a flag always are.
    pub fn enabled_in(self, flags: &NotifyConfig) -> bool {
        match self {
            NotifyKind::LoopComplete => flags.loop_complete,
            NotifyKind::Error => flags.error,
            NotifyKind::CircuitBreaker => flags.circuit_breaker,
            NotifyKind::RateLimit => flags.rate_limit,
            NotifyKind::Question => flags.question,
            NotifyKind::Status | NotifyKind::Startup | NotifyKind::Shutdown | NotifyKind::Reply => {
                true
            }
        }
    }
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a notification was dropped without sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    QuietHours,
    KindDisabled,
    /// Loop-complete with nothing done.
    NoActivity,
}

/// Result of a successful delivery attempt. Suppression is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Suppressed(SuppressReason),
}

impl Delivery {
    pub fn was_sent(self) -> bool {
        self == Delivery::Sent
    }
}

/// Formats and sends notifications for one chat.
pub struct Notifier {
    transport: Option<Arc<dyn Transport>>,
    gate: Gate,
    flags: NotifyConfig,
}

impl Notifier {
    /// `transport` is `None` when credentials are missing; every send then
    /// returns [`ChannelError::NotConfigured`].
    pub fn new(transport: Option<Arc<dyn Transport>>, gate: Gate, flags: NotifyConfig) -> Self {
        Self {
            transport,
            gate,
            flags,
        }
    }

    pub fn from_config(transport: Option<Arc<dyn Transport>>, config: &TetherConfig) -> Self {
        Self::new(transport, Gate::from_config(config), config.notify.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// Send `text` as a `kind` notification.
    pub async fn deliver(
        &self,
        kind: NotifyKind,
        text: &str,
        mode: ParseMode,
    ) -> Result<Delivery, ChannelError> {
        let transport = self.transport.as_ref().ok_or(ChannelError::NotConfigured)?;
        if !kind.enabled_in(&self.flags) {
            debug!(%kind, "notification kind disabled");
            return Ok(Delivery::Suppressed(SuppressReason::KindDisabled));
        }
        if self.gate.should_suppress(Utc::now()) {
            info!(%kind, "quiet hours, notification dropped");
            return Ok(Delivery::Suppressed(SuppressReason::QuietHours));
        }
        self.gate.throttle().await;
        transport.send(text, mode).await?;
        debug!(%kind, "notification sent");
        Ok(Delivery::Sent)
    }

    pub async fn send_status(
        &self,
        loop_number: Option<u64>,
        message: &str,
    ) -> Result<Delivery, ChannelError> {
        let text = format::format_status(loop_number, message);
        self.deliver(NotifyKind::Status, &text, ParseMode::MarkdownV2)
            .await
    }

    /// Skipped entirely when the iteration completed no tasks and touched no
    /// files.
    pub async fn send_loop_complete(&self, summary: &LoopSummary) -> Result<Delivery, ChannelError> {
        if !self.is_configured() {
            return Err(ChannelError::NotConfigured);
        }
        if summary.is_idle() {
            debug!(loop_number = summary.loop_number, "idle loop, no notification");
            return Ok(Delivery::Suppressed(SuppressReason::NoActivity));
        }
        let text = format::format_loop_complete(summary);
        self.deliver(NotifyKind::LoopComplete, &text, ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_error(
        &self,
        loop_number: Option<u64>,
        error: &str,
        context: Option<&str>,
    ) -> Result<Delivery, ChannelError> {
        let text = format::format_error(loop_number, error, context);
        self.deliver(NotifyKind::Error, &text, ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_circuit_change(
        &self,
        from: &str,
        to: &str,
        reason: Option<&str>,
    ) -> Result<Delivery, ChannelError> {
        let text = format::format_circuit_change(from, to, reason);
        self.deliver(NotifyKind::CircuitBreaker, &text, ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_rate_limit(&self, info: &RateLimitInfo) -> Result<Delivery, ChannelError> {
        let text = format::format_rate_limit(info);
        self.deliver(NotifyKind::RateLimit, &text, ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_question(
        &self,
        question: &str,
        context: Option<&str>,
        loop_number: Option<u64>,
        timeout_minutes: u64,
    ) -> Result<Delivery, ChannelError> {
        let text = format::format_question(question, context, loop_number, timeout_minutes);
        self.deliver(NotifyKind::Question, &text, ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_startup(
        &self,
        project: Option<&str>,
        max_calls: Option<u64>,
    ) -> Result<Delivery, ChannelError> {
        let text = format::format_startup(project, max_calls);
        self.deliver(NotifyKind::Startup, &text, ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_shutdown(
        &self,
        reason: Option<&str>,
        total_loops: Option<u64>,
    ) -> Result<Delivery, ChannelError> {
        let text = format::format_shutdown(reason, total_loops);
        self.deliver(NotifyKind::Shutdown, &text, ParseMode::MarkdownV2)
            .await
    }

    /// Already-formatted MarkdownV2 reply to the operator.
    pub async fn send_reply(&self, text: &str) -> Result<Delivery, ChannelError> {
        self.deliver(NotifyKind::Reply, text, ParseMode::MarkdownV2)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tether_types::QuietHoursConfig;

    use crate::channel::{BotIdentity, InboundUpdate};
    use crate::quiet_hours::QuietHours;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, text: &str, _mode: ParseMode) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(ChannelError::Api("Bad Request".into()));
            }
            Ok(())
        }

        async fn poll(&self, _offset: i64, _wait: u64) -> Result<Vec<InboundUpdate>, ChannelError> {
            Ok(Vec::new())
        }

        async fn identify(&self) -> Result<BotIdentity, ChannelError> {
            Err(ChannelError::Api("getMe is not scripted".into()))
        }
    }

    fn notifier_with(transport: Arc<RecordingTransport>, gate: Gate, flags: NotifyConfig) -> Notifier {
        Notifier::new(Some(transport as Arc<dyn Transport>), gate, flags)
    }

    fn all_day_quiet() -> Gate {
        let quiet = QuietHours::from_config(&QuietHoursConfig {
            enabled: true,
            start: "00:00".into(),
            end: "24:00".into(),
            timezone: Some("UTC".into()),
        });
        assert!(quiet.is_some());
        Gate::new(quiet, Duration::ZERO)
    }

    #[tokio::test]
    async fn unconfigured_notifier_reports_not_configured() {
        let notifier = Notifier::new(None, Gate::open(), NotifyConfig::default());
        let err = notifier.send_status(None, "hi").await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured));
        let err = notifier
            .send_loop_complete(&LoopSummary::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured));
    }

    #[tokio::test]
    async fn quiet_hours_suppress_without_transport_call() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier_with(transport.clone(), all_day_quiet(), NotifyConfig::default());

        let delivery = notifier.send_error(Some(1), "boom", None).await.unwrap();
        assert_eq!(delivery, Delivery::Suppressed(SuppressReason::QuietHours));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn idle_loop_complete_is_skipped() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier_with(transport.clone(), Gate::open(), NotifyConfig::default());

        let delivery = notifier
            .send_loop_complete(&LoopSummary {
                loop_number: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Suppressed(SuppressReason::NoActivity));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_loop_complete_sends_once() {
        for (tasks, files) in [(1, 0), (0, 1), (2, 5)] {
            let transport = Arc::new(RecordingTransport::default());
            let notifier = notifier_with(transport.clone(), Gate::open(), NotifyConfig::default());
            let delivery = notifier
                .send_loop_complete(&LoopSummary {
                    loop_number: 3,
                    tasks_completed: tasks,
                    files_modified: files,
                    summary: None,
                })
                .await
                .unwrap();
            assert!(delivery.was_sent());
            assert_eq!(transport.sent.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn disabled_kind_is_suppressed() {
        let transport = Arc::new(RecordingTransport::default());
        let flags = NotifyConfig {
            error: false,
            ..Default::default()
        };
        let notifier = notifier_with(transport.clone(), Gate::open(), flags);

        let delivery = notifier.send_error(None, "boom", None).await.unwrap();
        assert_eq!(delivery, Delivery::Suppressed(SuppressReason::KindDisabled));

        let delivery = notifier.send_status(None, "still on").await.unwrap();
        assert!(delivery.was_sent());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_returned() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let notifier = notifier_with(transport, Gate::open(), NotifyConfig::default());
        let err = notifier.send_startup(Some("demo"), None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Api(_)));
    }

    #[test]
    fn kinds_without_flags_are_always_enabled() {
        let all_off = NotifyConfig {
            question: false,
            loop_complete: false,
            error: false,
            circuit_breaker: false,
            rate_limit: false,
            ..Default::default()
        };
        for kind in [
            NotifyKind::Status,
            NotifyKind::Startup,
            NotifyKind::Shutdown,
            NotifyKind::Reply,
        ] {
            assert!(kind.enabled_in(&all_off), "{kind}");
        }
        for kind in [
            NotifyKind::Question,
            NotifyKind::LoopComplete,
            NotifyKind::Error,
            NotifyKind::CircuitBreaker,
            NotifyKind::RateLimit,
        ] {
            assert!(!kind.enabled_in(&all_off), "{kind}");
        }
    }
}
