//! File-backed state directory shared by every request handler.
//!
//! Each mock server instance owns one flat directory. Request handlers share
//! no memory; everything that must survive from one request to the next is a
//! small file in that directory.
//!
//! # Module Structure
//!
//! - `counter` - Request counter (`count.request`)
//! - `journal` - Last request and per-request history (`last.request`, `request.<n>`)
//! - `registry` - Ordered path pattern list (`PATH_LIST.list`)
//! - `alias` - Path to response reference bindings (`alias.<md5>`)
//! - `responses` - Content-addressed response files (`<reference>`)
//!
//! Every write goes through [`StateDir::write_atomic`], which writes a temp
//! file inside the directory and renames it over the target. Read-modify-write
//! sequences additionally hold [`StateDir::lock`].

mod alias;
mod counter;
mod journal;
mod registry;
mod responses;

pub use alias::AliasTable;
pub use counter::Counter;
pub use journal::Journal;
pub use registry::{escape_pattern, PathRegistry};
pub use responses::{ResponseStore, ENCODING_VERSION};

use crate::error::{Result, StoreError};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const REQUEST_COUNT_FILE: &str = "count.request";
pub const LAST_REQUEST_FILE: &str = "last.request";
pub const REQUEST_FILE_PREFIX: &str = "request.";
pub const PATH_LIST_FILE: &str = "PATH_LIST.list";
pub const ALIAS_FILE_PREFIX: &str = "alias.";
pub const LOCK_FILE: &str = "store.lock";

/// Handle on one mock server's state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
    locking: bool,
}

impl StateDir {
    /// Create the directory (if needed) and seed the counter with `0`.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::persistence(&root, e))?;
        let dir = Self {
            root,
            locking: true,
        };
        if !dir.file(REQUEST_COUNT_FILE).exists() {
            dir.write_atomic(REQUEST_COUNT_FILE, b"0")?;
        }
        info!("Initialized state directory {:?}", dir.root);
        Ok(dir)
    }

    /// Open an existing state directory without touching its contents.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::MissingDirectory(root));
        }
        Ok(Self {
            root,
            locking: true,
        })
    }

    /// Enable or disable the advisory lock around read-modify-write sequences.
    pub fn with_locking(mut self, locking: bool) -> Self {
        self.locking = locking;
        self
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Full path of a file directly inside the state directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn counter(&self) -> Counter<'_> {
        Counter::new(self)
    }

    pub fn journal(&self) -> Journal<'_> {
        Journal::new(self)
    }

    pub fn registry(&self) -> PathRegistry<'_> {
        PathRegistry::new(self)
    }

    pub fn aliases(&self) -> AliasTable<'_> {
        AliasTable::new(self)
    }

    pub fn responses(&self) -> ResponseStore<'_> {
        ResponseStore::new(self)
    }

    /// Read a file, mapping "does not exist" to `None`.
    pub(crate) fn read_optional(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.file(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Replace `name` with `bytes` so readers see either the old or the new
    /// content, never a partial write.
    pub(crate) fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.file(name);
        let mut temp =
            NamedTempFile::new_in(&self.root).map_err(|e| StoreError::persistence(&target, e))?;
        temp.write_all(bytes)
            .map_err(|e| StoreError::persistence(&target, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::persistence(&target, e))?;
        temp.persist(&target)
            .map_err(|e| StoreError::persistence(&target, e.error))?;
        debug!("Wrote {} bytes to {:?}", bytes.len(), target);
        Ok(())
    }

    /// Take the directory-wide exclusive lock. Released when the guard drops.
    ///
    /// The lock is per open file description, so it must not be taken twice
    /// on the same call path.
    pub fn lock(&self) -> Result<StoreLock> {
        if !self.locking {
            return Ok(StoreLock { file: None });
        }
        let path = self.file(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::Lock {
                path: path.clone(),
                source: e,
            })?;
        fs2::FileExt::lock_exclusive(&file).map_err(|e| StoreError::Lock { path, source: e })?;
        Ok(StoreLock { file: Some(file) })
    }
}

/// Guard for the advisory lock on `store.lock`.
#[derive(Debug)]
pub struct StoreLock {
    file: Option<File>,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
        }
    }
}
