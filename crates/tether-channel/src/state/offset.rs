//! Durable update cursor.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{read_optional, write_atomic, StateError};

/// Highest inbound update id already consumed.
///
/// Callers advance it as soon as they see an update, before deciding whether
/// the update is authorized or actionable, so nothing is ever delivered twice.
#[derive(Debug, Clone)]
pub struct OffsetStore {
    path: PathBuf,
}

impl OffsetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current offset; 0 when nothing has been stored or the file is unreadable.
    pub fn get(&self) -> i64 {
        let raw = match read_optional(&self.path) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                warn!(error = %e, "cannot read update offset, starting from 0");
                return 0;
            }
        };
        match raw.trim().parse::<i64>() {
            Ok(v) if v >= 0 => v,
            _ => {
                warn!(path = %self.path.display(), content = raw.trim(), "ignoring malformed update offset");
                0
            }
        }
    }

    /// Store `offset` exactly.
    pub fn set(&self, offset: i64) -> Result<(), StateError> {
        write_atomic(&self.path, offset.max(0).to_string().as_bytes())
    }

    /// Record `update_id` as consumed. The stored value never moves backward;
    /// returns whether it changed.
    pub fn advance(&self, update_id: i64) -> Result<bool, StateError> {
        if update_id <= self.get() {
            debug!(update_id, "offset already past update");
            return Ok(false);
        }
        self.set(update_id)?;
        Ok(true)
    }

    /// The `offset` argument for the next `getUpdates` call.
    pub fn next_poll_offset(&self) -> i64 {
        self.get() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, OffsetStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = OffsetStore::new(tmp.path().join(".tether/telegram_offset"));
        (tmp, store)
    }

    #[test]
    fn missing_offset_reads_zero() {
        let (_tmp, store) = store();
        assert_eq!(store.get(), 0);
        assert_eq!(store.next_poll_offset(), 1);
    }

    #[test]
    fn set_then_get_returns_value() {
        let (_tmp, store) = store();
        for value in [0, 1, 817_263_549, i64::MAX - 1] {
            store.set(value).unwrap();
            assert_eq!(store.get(), value);
        }
    }

    #[test]
    fn advance_is_monotonic() {
        let (_tmp, store) = store();
        assert!(store.advance(100).unwrap());
        assert!(!store.advance(99).unwrap());
        assert!(!store.advance(100).unwrap());
        assert_eq!(store.get(), 100);
        assert!(store.advance(101).unwrap());
        assert_eq!(store.get(), 101);
    }

    #[test]
    fn malformed_file_reads_zero() {
        let (_tmp, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "garbage").unwrap();
        assert_eq!(store.get(), 0);
        std::fs::write(store.path(), "-5").unwrap();
        assert_eq!(store.get(), 0);
    }

    #[test]
    fn survives_reopen() {
        let (_tmp, store) = store();
        store.set(77).unwrap();
        let reopened = OffsetStore::new(store.path());
        assert_eq!(reopened.get(), 77);
    }
}
