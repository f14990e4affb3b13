//! Read-only views of files written by the host loop.

use std::path::Path;

use serde::Deserialize;

use super::{read_optional, StateError};

/// The host's periodic status snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostStatus {
    #[serde(default, alias = "loop_count")]
    pub r#loop: Option<u64>,
    #[serde(default, alias = "calls_made_this_hour")]
    pub calls_made: Option<u64>,
    #[serde(default)]
    pub max_calls_per_hour: Option<u64>,
    #[serde(default, alias = "status")]
    pub state: Option<String>,
    #[serde(default)]
    pub last_action: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HostStatus {
    /// `None` when the host has not written a status yet.
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
}

/// First non-empty line of the session file.
pub fn read_session_id(path: &Path) -> Result<Option<String>, StateError> {
    Ok(read_optional(path)?.and_then(|raw| {
        raw.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }))
}

/// The last `lines` lines of the log, cut from the front so the result is
/// at most `max_bytes` long. `None` when the log does not exist.
pub fn tail_log(path: &Path, lines: usize, max_bytes: usize) -> Result<Option<String>, StateError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StateError::io(path, e)),
    };
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let tail = all[all.len().saturating_sub(lines)..].join("\n");
    Ok(Some(keep_last_bytes(&tail, max_bytes).to_string()))
}

fn keep_last_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
