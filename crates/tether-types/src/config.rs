//! Configuration types for the tether bridge.
//!
//! [`TetherConfig`] is the top-level configuration loaded from
//! `.tether/config.toml` (and the layers described in
//! [`config_loader`](crate::config_loader)). Every section has defaults, so an
//! empty file is a valid (if disabled) configuration.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::TetherError;

/// File name of a tether config layer.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TetherConfig {
    /// Raise the default log filter to `debug`.
    pub debug: bool,
    /// Bot credentials and polling behavior.
    pub telegram: TelegramConfig,
    /// Per-kind notification switches and timing.
    pub notify: NotifyConfig,
    /// Window during which outbound notifications are dropped.
    pub quiet_hours: QuietHoursConfig,
    /// Locations of durable state and host-owned files.
    pub paths: PathsConfig,
}

impl TetherConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, TetherError> {
        toml::from_str(content).map_err(|e| TetherError::ConfigError(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, TetherError> {
        toml::to_string_pretty(self).map_err(|e| TetherError::ConfigError(e.to_string()))
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather.
    pub bot_token: String,
    /// The single chat allowed to receive notifications and send commands.
    pub chat_id: Option<i64>,
    /// Master switch. Nothing is sent or polled while this is false.
    pub enabled: bool,
    /// Base URL of the Bot API (overridable for tests and self-hosted servers).
    pub api_base: String,
    /// Length of a single long-poll sub-wait, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: None,
            enabled: false,
            api_base: "https://api.telegram.org".into(),
            poll_interval_secs: 30,
        }
    }
}

/// Bot credentials, only available when the channel is fully configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bot_token: String,
    pub chat_id: i64,
}

impl TelegramConfig {
    /// Returns the credentials if the channel is enabled and both the token
    /// and chat id are set.
    pub fn credentials(&self) -> Option<Credentials> {
        if !self.enabled {
            return None;
        }
        let token = self.bot_token.trim();
        if token.is_empty() {
            return None;
        }
        let chat_id = self.chat_id?;
        Some(Credentials {
            bot_token: token.to_string(),
            chat_id,
        })
    }
}

/// Which notification kinds are sent, plus reply timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    pub question: bool,
    pub loop_complete: bool,
    pub error: bool,
    pub circuit_breaker: bool,
    pub rate_limit: bool,
    /// How long `ask` waits for an operator reply.
    pub question_timeout_minutes: u64,
    /// Minimum gap between two outbound messages.
    pub min_interval_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            question: true,
            loop_complete: true,
            error: true,
            circuit_breaker: true,
            rate_limit: true,
            question_timeout_minutes: 60,
            min_interval_ms: 1000,
        }
    }
}

/// Quiet hours, given as `HH:MM` times of day.
///
/// A window whose start is later than its end wraps midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuietHoursConfig {
    pub enabled: bool,
    pub start: String,
    pub end: String,
    /// IANA timezone name. Unset, `"local"` or an unknown name means the
    /// machine's local time.
    pub timezone: Option<String>,
}

impl QuietHoursConfig {
    /// Minute of the day where the window opens.
    pub fn start_minute(&self) -> Option<u32> {
        minute_of_day(&self.start, false)
    }

    /// Minute of the day where the window closes; `24:00` is 1440.
    pub fn end_minute(&self) -> Option<u32> {
        minute_of_day(&self.end, true)
    }
}

/// Parse `HH:MM` into minutes since midnight. `24:00` is accepted only when
/// `end_of_day` is set.
pub fn minute_of_day(raw: &str, end_of_day: bool) -> Option<u32> {
    static HH_MM: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:([01]\d|2[0-3]):([0-5]\d)|24:00)$").expect("HH:MM regex must compile")
    });
    let caps = HH_MM.captures(raw.trim())?;
    match (caps.get(1), caps.get(2)) {
        (Some(h), Some(m)) => {
            let hour: u32 = h.as_str().parse().ok()?;
            let minute: u32 = m.as_str().parse().ok()?;
            Some(hour * 60 + minute)
        }
        _ if end_of_day => Some(24 * 60),
        _ => None,
    }
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "23:00".into(),
            end: "07:00".into(),
            timezone: None,
        }
    }
}

/// File locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the files tether itself owns (offset, answer, flags).
    pub state_dir: PathBuf,
    /// Host status record (JSON).
    pub status_file: PathBuf,
    /// Host circuit-breaker record (JSON).
    pub circuit_breaker_file: PathBuf,
    /// Host session id file.
    pub session_file: PathBuf,
    /// Host log file tailed by `/logs`.
    pub log_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".tether"),
            status_file: PathBuf::from("status.json"),
            circuit_breaker_file: PathBuf::from(".circuit_breaker_state"),
            session_file: PathBuf::from(".claude_session_id"),
            log_file: PathBuf::from("logs/loop.log"),
        }
    }
}
