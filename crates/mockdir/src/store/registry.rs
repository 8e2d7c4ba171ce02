//! Ordered registry of path patterns.
//!
//! A pattern equal to the request path byte for byte always wins. Otherwise
//! patterns are tried in registration order as case-insensitive regular
//! expressions anchored at the end of the path (unanchored at the start).
//!
//! Patterns are NOT escaped: `.`, `*`, `(` and the like keep their regex
//! meaning. Use [`escape_pattern`] to register a literal path that should only
//! ever match itself as a suffix.

use super::{StateDir, PATH_LIST_FILE};
use crate::error::{Result, StoreError};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

const SEPARATOR: char = '\n';

pub struct PathRegistry<'a> {
    dir: &'a StateDir,
}

impl<'a> PathRegistry<'a> {
    pub(crate) fn new(dir: &'a StateDir) -> Self {
        Self { dir }
    }

    /// All registered patterns, first-registered first.
    pub fn patterns(&self) -> Result<Vec<String>> {
        let Some(bytes) = self.dir.read_optional(PATH_LIST_FILE)? else {
            return Ok(Vec::new());
        };
        let content = String::from_utf8(bytes).map_err(|e| StoreError::StoreCorruption {
            path: self.dir.file(PATH_LIST_FILE),
            reason: format!("path list is not valid UTF-8: {e}"),
        })?;
        if content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(content.split(SEPARATOR).map(str::to_string).collect())
    }

    /// Append `pattern` and rewrite the list under the directory lock.
    pub fn append(&self, pattern: &str) -> Result<()> {
        if pattern.contains(SEPARATOR) {
            return Err(StoreError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "patterns cannot contain a newline".to_string(),
            });
        }

        let _guard = self.dir.lock()?;
        let mut patterns = self.patterns()?;
        patterns.push(pattern.to_string());
        let joined = patterns.join("\n");
        self.dir.write_atomic(PATH_LIST_FILE, joined.as_bytes())?;
        debug!(pattern, total = patterns.len(), "Registered path pattern");
        Ok(())
    }

    /// First registered pattern matching `request_path`, if any.
    pub fn resolve(&self, request_path: &str) -> Result<Option<String>> {
        let patterns = self.patterns()?;
        Ok(first_match(&patterns, request_path).map(str::to_string))
    }
}

pub(crate) fn first_match<'p>(patterns: &'p [String], request_path: &str) -> Option<&'p str> {
    patterns
        .iter()
        .find(|pattern| pattern.as_str() == request_path)
        .or_else(|| {
            patterns
                .iter()
                .find(|pattern| suffix_matches(pattern, request_path))
        })
        .map(String::as_str)
}

fn suffix_matches(pattern: &str, request_path: &str) -> bool {
    match suffix_regex(pattern) {
        Ok(regex) => regex.is_match(request_path),
        Err(e) => {
            warn!(pattern, error = %e, "Skipping path pattern that is not a valid regex");
            false
        }
    }
}

fn suffix_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("(?:{pattern})$"))
        .case_insensitive(true)
        .build()
}

/// Escape every regex metacharacter so `path` is only matched literally.
pub fn escape_pattern(path: &str) -> String {
    regex::escape(path)
}
