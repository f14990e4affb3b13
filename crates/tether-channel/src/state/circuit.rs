//! Circuit-breaker record owned by the host loop.
//!
//! The bridge reads it for `/status` and rewrites it only to close the
//! breaker on `/reset`. Fields it does not know about are carried through
//! unchanged.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{read_optional, write_atomic, StateError};

/// Reason written when the operator resets the breaker remotely.
pub const MANUAL_RESET_REASON: &str = "Manual reset via Telegram";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("CLOSED"),
            CircuitState::HalfOpen => f.write_str("HALF_OPEN"),
            CircuitState::Open => f.write_str("OPEN"),
            CircuitState::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub state: CircuitState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub consecutive_no_progress: u64,
    #[serde(default)]
    pub consecutive_same_error: u64,
    #[serde(default)]
    pub consecutive_permission_denials: u64,
    /// RFC 3339 timestamp of the last transition, kept as text so a host
    /// writing another format does not make the record unreadable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CircuitRecord {
    /// Load the record; `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, StateError> {
        let Some(raw) = read_optional(path)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StateError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &json)
    }

    pub fn is_closed(&self) -> bool {
        self.state == CircuitState::Closed
    }

    /// Close the breaker, zero the progress counters and stamp the change.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Closed;
        self.reason = Some(MANUAL_RESET_REASON.to_string());
        self.consecutive_no_progress = 0;
        self.consecutive_same_error = 0;
        self.consecutive_permission_denials = 0;
        self.last_change = Some(now.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const OPEN_RECORD: &str = r#"{
        "state": "OPEN",
        "reason": "No progress in 3 loops",
        "consecutive_no_progress": 3,
        "consecutive_same_error": 2,
        "consecutive_permission_denials": 1,
        "last_change": "2024-05-01T10:00:00Z",
        "total_opens": 4,
        "current_loop": 17
    }"#;

    #[test]
    fn loads_known_and_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".circuit_breaker_state");
        std::fs::write(&path, OPEN_RECORD).unwrap();

        let record = CircuitRecord::load(&path).unwrap().unwrap();
        assert_eq!(record.state, CircuitState::Open);
        assert_eq!(record.consecutive_no_progress, 3);
        assert_eq!(record.extra["total_opens"], 4);
    }

    #[test]
    fn missing_record_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(CircuitRecord::load(&tmp.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn malformed_record_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cb");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            CircuitRecord::load(&path),
            Err(StateError::Parse { .. })
        ));
    }

    #[test]
    fn reset_preserves_unknown_fields_on_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cb");
        std::fs::write(&path, OPEN_RECORD).unwrap();

        let mut record = CircuitRecord::load(&path).unwrap().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        record.reset(now);
        record.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["state"], "CLOSED");
        assert_eq!(value["reason"], MANUAL_RESET_REASON);
        assert_eq!(value["consecutive_no_progress"], 0);
        assert_eq!(value["consecutive_same_error"], 0);
        assert_eq!(value["consecutive_permission_denials"], 0);
        assert_eq!(value["last_change"], "2024-05-02T08:00:00Z");
        assert_eq!(value["total_opens"], 4);
        assert_eq!(value["current_loop"], 17);
    }

    #[test]
    fn unrecognized_state_round_trips() {
        let record: CircuitRecord = serde_json::from_str(r#"{"state":"TRIPPED"}"#).unwrap();
        assert_eq!(record.state, CircuitState::Other("TRIPPED".into()));
        assert_eq!(record.state.to_string(), "TRIPPED");
        assert!(!record.is_closed());
    }
}
