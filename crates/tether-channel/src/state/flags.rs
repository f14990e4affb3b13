//! Pause and stop markers shared with the host loop.

use std::path::{Path, PathBuf};

use super::{remove_if_exists, write_atomic, StateError};

/// A boolean represented by the presence of an empty file.
#[derive(Debug, Clone)]
pub struct FlagFile {
    path: PathBuf,
}

impl FlagFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_set(&self) -> bool {
        self.path.exists()
    }

    /// Create the marker; returns `false` if it was already present.
    pub fn set(&self) -> Result<bool, StateError> {
        if self.is_set() {
            return Ok(false);
        }
        write_atomic(&self.path, b"")?;
        Ok(true)
    }

    /// Remove the marker; returns `false` if it was not present.
    pub fn clear(&self) -> Result<bool, StateError> {
        remove_if_exists(&self.path)
    }
}

/// The two control markers the operator can raise.
#[derive(Debug, Clone)]
pub struct ControlFlags {
    pub paused: FlagFile,
    /// Terminal from the remote side: nothing in the command set clears it.
    pub stop: FlagFile,
}

impl ControlFlags {
    pub fn new(pause_path: impl Into<PathBuf>, stop_path: impl Into<PathBuf>) -> Self {
        Self {
            paused: FlagFile::new(pause_path),
            stop: FlagFile::new(stop_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let flag = FlagFile::new(tmp.path().join(".tether/paused"));
        assert!(!flag.is_set());
        assert!(flag.set().unwrap());
        assert!(!flag.set().unwrap());
        assert!(flag.is_set());
    }

    #[test]
    fn clear_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let flag = FlagFile::new(tmp.path().join("paused"));
        flag.set().unwrap();
        assert!(flag.clear().unwrap());
        assert!(!flag.clear().unwrap());
        assert!(!flag.path().exists());
    }

    #[test]
    fn flags_are_independent() {
        let tmp = tempfile::tempdir().unwrap();
        let flags = ControlFlags::new(tmp.path().join("paused"), tmp.path().join("stop"));
        flags.stop.set().unwrap();
        assert!(flags.stop.is_set());
        assert!(!flags.paused.is_set());
    }
}
