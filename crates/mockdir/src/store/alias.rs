//! Alias table: normalized path -> response reference, one file per path.

use super::{StateDir, ALIAS_FILE_PREFIX};
use crate::error::{Result, StoreError};
use md5::{Digest, Md5};
use tracing::debug;

pub struct AliasTable<'a> {
    dir: &'a StateDir,
}

impl<'a> AliasTable<'a> {
    pub(crate) fn new(dir: &'a StateDir) -> Self {
        Self { dir }
    }

    /// Point `path` at `reference`. Rebinding overwrites.
    pub fn bind(&self, path: &str, reference: &str) -> Result<()> {
        let name = alias_file_name(path);
        self.dir.write_atomic(&name, reference.as_bytes())?;
        debug!(path, reference, file = %name, "Bound alias");
        Ok(())
    }

    /// Reference bound to `path`; an empty alias file counts as unbound.
    pub fn lookup(&self, path: &str) -> Result<Option<String>> {
        let name = alias_file_name(path);
        let Some(bytes) = self.dir.read_optional(&name)? else {
            return Ok(None);
        };
        let reference = String::from_utf8(bytes).map_err(|e| StoreError::StoreCorruption {
            path: self.dir.file(&name),
            reason: format!("alias target is not valid UTF-8: {e}"),
        })?;
        Ok(Some(reference).filter(|r| !r.is_empty()))
    }
}

/// Exactly one leading `/`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// 32 lowercase hex characters identifying `path` after normalization.
pub fn alias_key(path: &str) -> String {
    hex::encode(Md5::digest(normalize_path(path).as_bytes()))
}

pub(crate) fn alias_file_name(path: &str) -> String {
    format!("{ALIAS_FILE_PREFIX}{}", alias_key(path))
}
