//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tether_channel::{BotIdentity, Bridge, ChannelError, InboundUpdate, ParseMode, Transport};
use tether_types::TetherConfig;

/// The authorized operator chat in every test.
pub const OPERATOR_CHAT: i64 = 123456;
/// A chat that is not allowed to answer.
pub const STRANGER_CHAT: i64 = 999999;

/// One scripted reply to a `poll` call.
pub enum PollStep {
    Updates(Vec<InboundUpdate>),
    Fail(String),
}

/// A transport that replays scripted poll results and records everything.
///
/// Once the script runs out, `poll` sleeps for the requested wait and
/// returns nothing, like an idle long-poll.
#[derive(Default)]
pub struct FakeTransport {
    /// Returned on every poll whose offset is at or below their id.
    resident: Vec<InboundUpdate>,
    script: Mutex<VecDeque<PollStep>>,
    sent: Mutex<Vec<String>>,
    polls: Mutex<Vec<(i64, u64)>>,
    fail_sends: bool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every send fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_sends: true,
            ..Default::default()
        })
    }

    /// Keeps returning `updates` until a poll offset moves past them, the
    /// way the Bot API re-sends unacknowledged updates.
    pub fn with_resident(updates: Vec<InboundUpdate>) -> Arc<Self> {
        Arc::new(Self {
            resident: updates,
            ..Default::default()
        })
    }

    pub fn push(&self, step: PollStep) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn push_updates(&self, updates: Vec<InboundUpdate>) {
        self.push(PollStep::Updates(updates));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// `(offset, wait_secs)` of every poll, in order.
    pub fn polls(&self) -> Vec<(i64, u64)> {
        self.polls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, text: &str, _mode: ParseMode) -> Result<(), ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::Api("Bad Gateway".into()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn poll(&self, offset: i64, wait_secs: u64) -> Result<Vec<InboundUpdate>, ChannelError> {
        self.polls.lock().unwrap().push((offset, wait_secs));
        let due: Vec<InboundUpdate> = self
            .resident
            .iter()
            .filter(|u| u.update_id >= offset)
            .cloned()
            .collect();
        if !due.is_empty() {
            return Ok(due);
        }
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(PollStep::Updates(updates)) => Ok(updates),
            Some(PollStep::Fail(msg)) => Err(ChannelError::Api(msg)),
            None => {
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn identify(&self) -> Result<BotIdentity, ChannelError> {
        Ok(BotIdentity {
            id: 1,
            first_name: "Tether".into(),
            username: Some("tether_test_bot".into()),
        })
    }
}

/// A text message update.
pub fn message(update_id: i64, chat_id: i64, text: &str) -> InboundUpdate {
    InboundUpdate {
        update_id,
        chat_id: Some(chat_id),
        text: Some(text.to_string()),
    }
}

/// Config with credentials, no throttle and short timings.
pub fn test_config() -> TetherConfig {
    let mut config = TetherConfig::default();
    config.telegram.enabled = true;
    config.telegram.bot_token = "123:test-token".into();
    config.telegram.chat_id = Some(OPERATOR_CHAT);
    config.telegram.poll_interval_secs = 5;
    config.notify.min_interval_ms = 0;
    config.notify.question_timeout_minutes = 1;
    config
}

/// A bridge over `transport` with state under `base`.
pub fn bridge(base: &Path, config: TetherConfig, transport: &Arc<FakeTransport>) -> Bridge {
    Bridge::with_transport(config, base, Some(transport.clone() as Arc<dyn Transport>))
}
