//! Durable file layout.
//!
//! Everything tether persists lives in the state directory; host-owned files
//! (status, circuit breaker, session, log) are only read, except for the
//! circuit-breaker record which `/reset` may rewrite.

use std::path::{Path, PathBuf};

use crate::config::PathsConfig;

/// Resolved locations of every file the bridge reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    /// Last consumed update id.
    pub offset: PathBuf,
    /// Operator answer awaiting the host.
    pub pending_answer: PathBuf,
    /// Marker: loop paused.
    pub pause_flag: PathBuf,
    /// Marker: stop requested.
    pub stop_flag: PathBuf,
    pub status: PathBuf,
    pub circuit_breaker: PathBuf,
    pub session: PathBuf,
    pub log: PathBuf,
}

impl StatePaths {
    /// Resolve the configured paths against `base` (usually the working
    /// directory). Absolute paths are kept as-is.
    pub fn resolve(base: &Path, config: &PathsConfig) -> Self {
        let state_dir = base.join(&config.state_dir);
        Self {
            offset: state_dir.join("telegram_offset"),
            pending_answer: state_dir.join("pending_answer"),
            pause_flag: state_dir.join("paused"),
            stop_flag: state_dir.join("stop_requested"),
            status: base.join(&config.status_file),
            circuit_breaker: base.join(&config.circuit_breaker_file),
            session: base.join(&config.session_file),
            log: base.join(&config.log_file),
        }
    }

    /// Layout rooted at `base` with default file names.
    pub fn under(base: &Path) -> Self {
        Self::resolve(base, &PathsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let paths = StatePaths::under(Path::new("/work"));
        assert_eq!(paths.offset, PathBuf::from("/work/.tether/telegram_offset"));
        assert_eq!(paths.pause_flag, PathBuf::from("/work/.tether/paused"));
        assert_eq!(paths.circuit_breaker, PathBuf::from("/work/.circuit_breaker_state"));
        assert_eq!(paths.log, PathBuf::from("/work/logs/loop.log"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = PathsConfig {
            log_file: PathBuf::from("/var/log/loop.log"),
            ..PathsConfig::default()
        };
        let paths = StatePaths::resolve(Path::new("/work"), &config);
        assert_eq!(paths.log, PathBuf::from("/var/log/loop.log"));
        assert_eq!(paths.status, PathBuf::from("/work/status.json"));
    }
}
