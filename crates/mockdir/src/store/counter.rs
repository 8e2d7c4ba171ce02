//! Persisted request counter.

use super::{StateDir, StoreLock, REQUEST_COUNT_FILE};
use crate::error::{Result, StoreError};
use tracing::debug;

/// The `count.request` file: a decimal integer, bumped once per request.
pub struct Counter<'a> {
    dir: &'a StateDir,
}

impl<'a> Counter<'a> {
    pub(crate) fn new(dir: &'a StateDir) -> Self {
        Self { dir }
    }

    /// Current value without modifying it. A missing or unparsable file reads as 0.
    pub fn current(&self) -> Result<u64> {
        let Some(bytes) = self.dir.read_optional(REQUEST_COUNT_FILE)? else {
            return Ok(0);
        };
        let text = String::from_utf8(bytes).map_err(|e| StoreError::StoreCorruption {
            path: self.dir.file(REQUEST_COUNT_FILE),
            reason: format!("counter is not valid UTF-8: {e}"),
        })?;
        Ok(text.trim().parse().unwrap_or(0))
    }

    /// Increment under the directory lock and return the new value.
    pub fn increment(&self) -> Result<u64> {
        let guard = self.dir.lock()?;
        self.increment_locked(&guard)
    }

    /// Increment while the caller already holds the directory lock.
    pub fn increment_locked(&self, _guard: &StoreLock) -> Result<u64> {
        let next = self
            .current()?
            .checked_add(1)
            .ok_or_else(|| StoreError::StoreCorruption {
                path: self.dir.file(REQUEST_COUNT_FILE),
                reason: "counter is at its maximum value".to_string(),
            })?;
        self.dir
            .write_atomic(REQUEST_COUNT_FILE, next.to_string().as_bytes())?;
        debug!(count = next, "Incremented request counter");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_counter_reads_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::open(tmp.path()).unwrap();
        assert_eq!(dir.counter().current().unwrap(), 0);
        assert_eq!(dir.counter().increment().unwrap(), 1);
    }

    #[test]
    fn test_increment_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        let counter = dir.counter();
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment().unwrap(), 2);
        assert_eq!(counter.increment().unwrap(), 3);
        assert_eq!(
            fs::read_to_string(dir.file(REQUEST_COUNT_FILE)).unwrap(),
            "3"
        );
    }

    #[test]
    fn test_garbage_counter_restarts_from_zero() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(REQUEST_COUNT_FILE), "not a number").unwrap();
        let dir = StateDir::open(tmp.path()).unwrap();
        assert_eq!(dir.counter().increment().unwrap(), 1);
    }

    #[test]
    fn test_non_utf8_counter_is_corruption() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(REQUEST_COUNT_FILE), [0xff, 0xfe, 0x00]).unwrap();
        let dir = StateDir::open(tmp.path()).unwrap();
        let err = dir.counter().increment().unwrap_err();
        assert!(matches!(err, StoreError::StoreCorruption { .. }));
    }

    #[test]
    fn test_saturated_counter_is_corruption() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(REQUEST_COUNT_FILE), u64::MAX.to_string()).unwrap();
        let dir = StateDir::open(tmp.path()).unwrap();
        let err = dir.counter().increment().unwrap_err();
        assert!(matches!(err, StoreError::StoreCorruption { .. }));
        assert_eq!(dir.counter().current().unwrap(), u64::MAX);
    }

    #[test]
    fn test_increment_under_held_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        let guard = dir.lock().unwrap();
        assert_eq!(dir.counter().increment_locked(&guard).unwrap(), 1);
        assert_eq!(dir.counter().increment_locked(&guard).unwrap(), 2);
        drop(guard);
        assert_eq!(dir.counter().increment().unwrap(), 3);
    }
}
