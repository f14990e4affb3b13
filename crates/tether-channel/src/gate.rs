//! Outbound gate: quiet-hours suppression and send throttling.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use tether_types::TetherConfig;

use crate::quiet_hours::QuietHours;

/// Decides, per outbound send, whether to drop it or how long to hold it.
///
/// The last-send instant is process-local; consecutive sends through the
/// same gate are at least `min_interval` apart.
#[derive(Debug)]
pub struct Gate {
    quiet: Option<QuietHours>,
    min_interval: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl Gate {
    pub fn new(quiet: Option<QuietHours>, min_interval: Duration) -> Self {
        Self {
            quiet,
            min_interval,
            last_send: Mutex::new(None),
        }
    }

    /// Gate configured from the `[quiet_hours]` and `[notify]` sections.
    pub fn from_config(config: &TetherConfig) -> Self {
        Self::new(
            QuietHours::from_config(&config.quiet_hours),
            Duration::from_millis(config.notify.min_interval_ms),
        )
    }

    /// A gate that never suppresses and never waits.
    pub fn open() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Whether a send at `now` falls in quiet hours.
    pub fn should_suppress(&self, now: DateTime<Utc>) -> bool {
        self.quiet.as_ref().is_some_and(|q| q.contains(now))
    }

    /// Wait until the minimum interval since the previous send has passed,
    /// then record the current instant as the last send.
    pub async fn throttle(&self) {
        let wait = match *self.last_send() {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        };
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "throttling outbound message");
            tokio::time::sleep(wait).await;
        }
        *self.last_send() = Some(Instant::now());
    }

    fn last_send(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_send
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
