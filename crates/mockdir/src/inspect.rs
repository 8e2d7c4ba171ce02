//! Consistency report for a state directory.

use crate::error::{Result, StoreError};
use crate::store::{StateDir, ALIAS_FILE_PREFIX};
use serde::Serialize;
use std::fs;

/// Health of one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum TargetState {
    Ok(String),
    Missing,
    Corrupt(String),
}

impl TargetState {
    pub fn is_ok(&self) -> bool {
        matches!(self, TargetState::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub pattern: String,
    /// Reference the pattern's alias points at, if bound.
    pub reference: Option<String>,
    pub target: Option<TargetState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AliasReport {
    pub file: String,
    pub reference: String,
    pub target: TargetState,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub request_count: u64,
    pub journal_entries: usize,
    pub patterns: Vec<PatternReport>,
    pub aliases: Vec<AliasReport>,
    /// Response files that failed to decode, with the reason.
    pub corrupt_responses: Vec<(String, String)>,
    pub response_files: usize,
}

impl InspectionReport {
    pub fn is_healthy(&self) -> bool {
        self.aliases.iter().all(|a| a.target.is_ok()) && self.corrupt_responses.is_empty()
    }
}

fn target_state(dir: &StateDir, reference: &str) -> TargetState {
    match dir.responses().load_optional(reference) {
        Ok(Some(response)) => TargetState::Ok(response.kind().to_string()),
        Ok(None) => TargetState::Missing,
        Err(e) => TargetState::Corrupt(e.to_string()),
    }
}

fn is_reference_name(name: &str) -> bool {
    name.len() == 32 && name.chars().all(|c| c.is_ascii_hexdigit())
}

/// Walk the directory and check every alias and response file.
pub fn inspect(dir: &StateDir) -> Result<InspectionReport> {
    let request_count = dir.counter().current()?;

    let mut patterns = Vec::new();
    for pattern in dir.registry().patterns()? {
        let reference = dir.aliases().lookup(&pattern)?;
        let target = reference.as_deref().map(|r| target_state(dir, r));
        patterns.push(PatternReport {
            pattern,
            reference,
            target,
        });
    }

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .map_err(|e| StoreError::io(dir.path(), e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut aliases = Vec::new();
    let mut corrupt_responses = Vec::new();
    let mut response_files = 0;
    let mut journal_entries = 0;

    for name in &names {
        if name.starts_with(ALIAS_FILE_PREFIX) {
            let reference = fs::read_to_string(dir.file(name))
                .map_err(|e| StoreError::io(dir.file(name), e))?;
            let target = if reference.is_empty() {
                TargetState::Missing
            } else {
                target_state(dir, &reference)
            };
            aliases.push(AliasReport {
                file: name.clone(),
                reference,
                target,
            });
        } else if name.starts_with(crate::store::REQUEST_FILE_PREFIX) {
            journal_entries += 1;
        } else if is_reference_name(name) {
            response_files += 1;
            if let Err(e) = dir.responses().load(name) {
                corrupt_responses.push((name.clone(), e.to_string()));
            }
        }
    }

    Ok(InspectionReport {
        request_count,
        journal_entries,
        patterns,
        aliases,
        corrupt_responses,
        response_files,
    })
}
