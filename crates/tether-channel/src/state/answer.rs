//! The operator's answer waiting for the host to pick it up.

use std::path::{Path, PathBuf};

use super::{read_optional, remove_if_exists, write_atomic, StateError};

/// Single-slot store for the operator's free-text answer.
///
/// The host consumes it exactly once with [`take`](Self::take); storing a new
/// answer replaces any unread one.
#[derive(Debug, Clone)]
pub struct PendingAnswer {
    path: PathBuf,
}

impl PendingAnswer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self, answer: &str) -> Result<(), StateError> {
        write_atomic(&self.path, answer.as_bytes())
    }

    /// Read without consuming.
    pub fn peek(&self) -> Result<Option<String>, StateError> {
        read_optional(&self.path)
    }

    /// Read and delete. A second call returns `None`.
    pub fn take(&self) -> Result<Option<String>, StateError> {
        let answer = self.peek()?;
        if answer.is_some() {
            remove_if_exists(&self.path)?;
        }
        Ok(answer)
    }

    /// Drop any unread answer; returns whether one existed.
    pub fn clear(&self) -> Result<bool, StateError> {
        remove_if_exists(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = PendingAnswer::new(tmp.path().join(".tether/pending_answer"));

        slot.store("Use REST").unwrap();
        assert_eq!(slot.peek().unwrap().as_deref(), Some("Use REST"));
        assert_eq!(slot.take().unwrap().as_deref(), Some("Use REST"));
        assert_eq!(slot.take().unwrap(), None);
    }

    #[test]
    fn store_replaces_unread_answer() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = PendingAnswer::new(tmp.path().join("answer"));
        slot.store("first").unwrap();
        slot.store("second").unwrap();
        assert_eq!(slot.take().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn clear_reports_whether_present() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = PendingAnswer::new(tmp.path().join("answer"));
        assert!(!slot.clear().unwrap());
        slot.store("x").unwrap();
        assert!(slot.clear().unwrap());
        assert_eq!(slot.peek().unwrap(), None);
    }
}
