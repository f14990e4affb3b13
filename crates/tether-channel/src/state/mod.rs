//! Durable file-backed state.
//!
//! The bridge keeps its cursor, the operator's pending answer and the
//! pause/stop markers as small files, and reads (or in one case rewrites) a
//! few files owned by the host loop. One host process and one operator is
//! the supported arrangement, so no locking is done.

pub mod answer;
pub mod circuit;
pub mod flags;
pub mod host;
pub mod offset;

use std::path::{Path, PathBuf};

pub use answer::PendingAnswer;
pub use circuit::{CircuitRecord, CircuitState};
pub use flags::{ControlFlags, FlagFile};
pub use host::{read_session_id, tail_log, HostStatus};
pub use offset::OffsetStore;

/// Errors reading or writing state files.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: malformed JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `contents` to `path` atomically (write tmp, then rename), creating
/// the parent directory if needed.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents).map_err(|e| StateError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| StateError::io(path, e))
}

/// Read a file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, StateError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StateError::io(path, e)),
    }
}

/// Remove a file, returning whether it existed.
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, StateError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StateError::io(path, e)),
    }
}
