//! Content-addressed response files.
//!
//! Files hold a versioned JSON envelope: `{"version": 1, "response": {...}}`
//! where the response carries a `kind` discriminator.

use super::StateDir;
use crate::error::{Result, StoreError};
use crate::response::{MockResponse, Response};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use tracing::debug;

pub const ENCODING_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    response: &'a Response,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    response: serde_json::Value,
}

pub struct ResponseStore<'a> {
    dir: &'a StateDir,
}

impl<'a> ResponseStore<'a> {
    pub(crate) fn new(dir: &'a StateDir) -> Self {
        Self { dir }
    }

    /// Persist `response` under its own reference and return the reference.
    pub fn store(&self, response: &Response) -> Result<String> {
        let reference = response.reference();
        let name = self.checked_name(&reference)?;
        let encoded = encode(response)?;
        self.dir.write_atomic(name, &encoded)?;
        debug!(reference = %reference, kind = response.kind(), "Stored response");
        Ok(reference)
    }

    /// Load the response stored under `reference`.
    pub fn load(&self, reference: &str) -> Result<Response> {
        let name = self.checked_name(reference)?;
        let path = self.dir.file(name);
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        decode(&bytes, reference)
    }

    /// Like [`load`](Self::load), but a missing or unreadable file is `None`.
    pub fn load_optional(&self, reference: &str) -> Result<Option<Response>> {
        let name = self.checked_name(reference)?;
        let path = self.dir.file(name);
        match fs::read(&path) {
            Ok(bytes) => decode(&bytes, reference).map(Some),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                debug!(reference, "Response file is not readable");
                Ok(None)
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// References become file names directly inside the state directory.
    fn checked_name<'r>(&self, reference: &'r str) -> Result<&'r str> {
        let valid = !reference.is_empty()
            && !reference.starts_with('.')
            && !reference.contains(['/', '\\', '\0']);
        if valid {
            Ok(reference)
        } else {
            Err(StoreError::StoreCorruption {
                path: self.dir.path().to_path_buf(),
                reason: format!("{reference:?} is not a valid response reference"),
            })
        }
    }
}

pub fn encode(response: &Response) -> Result<Vec<u8>> {
    let envelope = EnvelopeOut {
        version: ENCODING_VERSION,
        response,
    };
    serde_json::to_vec(&envelope).map_err(|source| StoreError::Encode {
        what: "response",
        source,
    })
}

pub fn decode(bytes: &[u8], reference: &str) -> Result<Response> {
    let envelope: EnvelopeIn =
        serde_json::from_slice(bytes).map_err(|e| StoreError::InvalidSerializedResponse {
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;
    if envelope.version != ENCODING_VERSION {
        return Err(StoreError::CorruptState {
            reference: reference.to_string(),
            reason: format!(
                "unsupported encoding version {} (expected {ENCODING_VERSION})",
                envelope.version
            ),
        });
    }
    serde_json::from_value(envelope.response).map_err(|e| StoreError::InvalidSerializedResponse {
        reference: reference.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestRecord;
    use crate::response::{Sequenced, SequenceResponse, StaticResponse};
    use serde_json::json;

    #[test]
    fn test_store_then_load_serves_the_same() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        let response: Response = StaticResponse::new("{\"ok\":true}")
            .with_status(201)
            .with_header("Content-Type", "application/json")
            .into();

        let reference = dir.responses().store(&response).unwrap();
        assert_eq!(reference, response.reference());
        assert!(dir.file(&reference).exists());

        let loaded = dir.responses().load(&reference).unwrap();
        let req = RequestRecord::get("/x");
        assert_eq!(loaded.status(&req), 201);
        assert_eq!(loaded.headers(&req), response.headers(&req));
        assert_eq!(loaded.body(&req), response.body(&req));
    }

    #[test]
    fn test_file_is_versioned_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        let reference = dir
            .responses()
            .store(&StaticResponse::new("x").into())
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.file(&reference)).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["response"]["kind"], "static");
    }

    #[test]
    fn test_restore_advanced_sequence_overwrites_same_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        let mut response: Response = SequenceResponse::new(vec![
            StaticResponse::new("a").into(),
            StaticResponse::new("b").into(),
        ])
        .into();
        let first = dir.responses().store(&response).unwrap();
        response.as_sequenced().unwrap().advance();
        let second = dir.responses().store(&response).unwrap();
        assert_eq!(first, second);

        let loaded = dir.responses().load(&first).unwrap();
        assert_eq!(loaded.body(&RequestRecord::get("/")), "b");
    }

    #[test]
    fn test_garbage_is_invalid_serialized_response() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        fs::write(dir.file("deadbeef"), "a:1:{s:3:\"php\";}").unwrap();
        assert!(matches!(
            dir.responses().load("deadbeef"),
            Err(StoreError::InvalidSerializedResponse { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_is_invalid_serialized_response() {
        let bytes = serde_json::to_vec(&json!({
            "version": 1,
            "response": {"kind": "telepathy"}
        }))
        .unwrap();
        assert!(matches!(
            decode(&bytes, "r"),
            Err(StoreError::InvalidSerializedResponse { .. })
        ));
    }

    #[test]
    fn test_future_version_is_corrupt_state() {
        let bytes = serde_json::to_vec(&json!({
            "version": 99,
            "response": {"kind": "static", "body": "x"}
        }))
        .unwrap();
        assert!(matches!(
            decode(&bytes, "r"),
            Err(StoreError::CorruptState { .. })
        ));
    }

    #[test]
    fn test_load_optional_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        assert!(dir.responses().load_optional("0123").unwrap().is_none());
        assert!(matches!(
            dir.responses().load("0123"),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_reference_cannot_escape_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        for bad in ["../etc/passwd", "", ".hidden", "a/b"] {
            assert!(matches!(
                dir.responses().load_optional(bad),
                Err(StoreError::StoreCorruption { .. })
            ));
        }
    }
}
