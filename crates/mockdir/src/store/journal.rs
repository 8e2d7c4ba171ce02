//! Request journal: the latest request plus one write-once entry per request.

use super::{StateDir, LAST_REQUEST_FILE, REQUEST_FILE_PREFIX};
use crate::error::{Result, StoreError};
use crate::request::RequestRecord;
use tracing::debug;

pub struct Journal<'a> {
    dir: &'a StateDir,
}

impl<'a> Journal<'a> {
    pub(crate) fn new(dir: &'a StateDir) -> Self {
        Self { dir }
    }

    /// Write `request` to `last.request` and to `request.<count>`.
    pub fn record(&self, request: &RequestRecord, count: u64) -> Result<()> {
        let encoded = serde_json::to_vec(request).map_err(|source| StoreError::Encode {
            what: "request record",
            source,
        })?;
        self.dir.write_atomic(LAST_REQUEST_FILE, &encoded)?;
        self.dir.write_atomic(&history_file(count), &encoded)?;
        debug!(count, path = request.path(), "Journaled request");
        Ok(())
    }

    pub fn last(&self) -> Result<Option<RequestRecord>> {
        self.read(LAST_REQUEST_FILE)
    }

    /// The `n`-th request handled by this directory, 1-based.
    pub fn get(&self, n: u64) -> Result<Option<RequestRecord>> {
        if n == 0 {
            return Ok(None);
        }
        self.read(&history_file(n))
    }

    /// Offset lookup: `0` is the first request, `-1` the latest.
    pub fn by_offset(&self, offset: i64) -> Result<Option<RequestRecord>> {
        let n = if offset >= 0 {
            offset.unsigned_abs() + 1
        } else {
            let count = self.count()?;
            match (count + 1).checked_sub(offset.unsigned_abs()) {
                Some(n) => n,
                None => return Ok(None),
            }
        };
        self.get(n)
    }

    /// Number of requests the counter says were handled.
    pub fn count(&self) -> Result<u64> {
        self.dir.counter().current()
    }

    fn read(&self, name: &str) -> Result<Option<RequestRecord>> {
        let Some(bytes) = self.dir.read_optional(name)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::StoreCorruption {
                path: self.dir.file(name),
                reason: format!("journal entry is not a request record: {e}"),
            })
    }
}

pub(crate) fn history_file(count: u64) -> String {
    format!("{REQUEST_FILE_PREFIX}{count}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal_three(dir: &StateDir) {
        for path in ["/one", "/two", "/three"] {
            let n = dir.counter().increment().unwrap();
            dir.journal().record(&RequestRecord::get(path), n).unwrap();
        }
    }

    #[test]
    fn test_record_writes_last_and_history() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        journal_three(&dir);

        assert!(dir.file("request.1").exists());
        assert!(dir.file("request.3").exists());
        assert!(!dir.file("request.4").exists());

        let journal = dir.journal();
        assert_eq!(journal.last().unwrap().unwrap().path(), "/three");
        assert_eq!(journal.get(2).unwrap().unwrap().path(), "/two");
        assert!(journal.get(0).unwrap().is_none());
        assert_eq!(journal.count().unwrap(), 3);
    }

    #[test]
    fn test_by_offset() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        journal_three(&dir);
        let journal = dir.journal();

        assert_eq!(journal.by_offset(0).unwrap().unwrap().path(), "/one");
        assert_eq!(journal.by_offset(2).unwrap().unwrap().path(), "/three");
        assert!(journal.by_offset(3).unwrap().is_none());
        assert_eq!(journal.by_offset(-1).unwrap().unwrap().path(), "/three");
        assert_eq!(journal.by_offset(-3).unwrap().unwrap().path(), "/one");
        assert!(journal.by_offset(-4).unwrap().is_none());
    }

    #[test]
    fn test_empty_journal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        assert!(dir.journal().last().unwrap().is_none());
        assert!(dir.journal().by_offset(-1).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        std::fs::write(dir.file("request.1"), "garbage").unwrap();
        assert!(matches!(
            dir.journal().get(1),
            Err(StoreError::StoreCorruption { .. })
        ));
    }
}
