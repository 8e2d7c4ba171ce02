//! Per-request dispatch against a state directory.
//!
//! One call to [`Dispatcher::handle`] is one complete request:
//!
//! 1. bump the counter and journal the request under the new value
//! 2. resolve the request path against the path registry (unmatched paths
//!    pass through unchanged)
//! 3. look the resolved path up in the alias table, falling back to the
//!    direct-reference form `/<vendor>/<32 hex>`
//! 4. serve the stored response (advancing and re-persisting sequenced
//!    ones), answer 404 if the referenced file is gone, or echo the request
//!    as JSON when nothing resolved at all
//!
//! Nothing is kept between calls; every call re-reads the directory.

use crate::error::{Result, StoreError};
use crate::metrics;
use crate::request::RequestRecord;
use crate::response::{MockResponse, DEFAULT_VENDOR_PREFIX};
use crate::store::StateDir;
use std::time::Instant;
use tracing::{debug, error, warn};

const REFERENCE_TOKEN_LEN: usize = 32;

/// Status and body of a handled request. Headers went to the header sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub outcome: Outcome,
}

/// How the request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served through an alias bound to the resolved path.
    Alias,
    /// Served through a `/<vendor>/<reference>` URL.
    Direct,
    /// A reference was found but its response file was not readable.
    NotFound,
    /// Nothing resolved; the request was echoed back as JSON.
    Echo,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Alias => "alias",
            Outcome::Direct => "direct",
            Outcome::NotFound => "not_found",
            Outcome::Echo => "echo",
        }
    }
}

#[derive(Debug)]
enum DataRef {
    Alias(String),
    Direct(String),
}

impl DataRef {
    fn reference(&self) -> &str {
        match self {
            DataRef::Alias(r) | DataRef::Direct(r) => r,
        }
    }

    fn outcome(&self) -> Outcome {
        match self {
            DataRef::Alias(_) => Outcome::Alias,
            DataRef::Direct(_) => Outcome::Direct,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    dir: StateDir,
    vendor_prefix: String,
}

impl Dispatcher {
    pub fn new(dir: StateDir) -> Self {
        Self::with_vendor_prefix(dir, DEFAULT_VENDOR_PREFIX)
    }

    pub fn with_vendor_prefix(dir: StateDir, vendor_prefix: impl Into<String>) -> Self {
        Self {
            dir,
            vendor_prefix: vendor_prefix.into(),
        }
    }

    pub fn state_dir(&self) -> &StateDir {
        &self.dir
    }

    pub fn vendor_prefix(&self) -> &str {
        &self.vendor_prefix
    }

    /// Handle one request. Every header line is passed to `header` in order.
    pub fn handle(&self, request: &RequestRecord, header: &mut dyn FnMut(&str)) -> Result<Reply> {
        let start = Instant::now();
        let result = self.dispatch(request, header);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(reply) => {
                debug!(
                    method = %request.method,
                    path = request.path(),
                    status = reply.status,
                    outcome = reply.outcome.as_str(),
                    "Handled request"
                );
                metrics::record_dispatch(reply.outcome.as_str(), elapsed_ms);
            }
            Err(e) => {
                error!(
                    method = %request.method,
                    path = request.path(),
                    kind = e.kind(),
                    "Failed to handle request: {}",
                    e
                );
                metrics::record_dispatch("error", elapsed_ms);
            }
        }
        result
    }

    fn dispatch(&self, request: &RequestRecord, header: &mut dyn FnMut(&str)) -> Result<Reply> {
        // Held across both writes so `last.request` always matches the
        // highest `request.<n>`.
        let guard = self.dir.lock()?;
        let count = self.dir.counter().increment_locked(&guard)?;
        self.dir.journal().record(request, count)?;
        drop(guard);

        let request_path = request.path();
        let resolved = self
            .dir
            .registry()
            .resolve(request_path)?
            .unwrap_or_else(|| request_path.to_string());
        debug!(request_path, resolved = %resolved, "Resolved request path");

        match self.data_ref(&resolved)? {
            Some(data_ref) => self.serve(request, &resolved, data_ref, header),
            None => self.echo(request, header),
        }
    }

    fn data_ref(&self, resolved: &str) -> Result<Option<DataRef>> {
        if let Some(reference) = self.dir.aliases().lookup(resolved)? {
            return Ok(Some(DataRef::Alias(reference)));
        }
        Ok(self.direct_reference(resolved).map(DataRef::Direct))
    }

    /// Token from `/<vendor>/<32 hex>`, if `path` has exactly that shape.
    pub fn direct_reference(&self, path: &str) -> Option<String> {
        let token = path
            .strip_prefix('/')?
            .strip_prefix(self.vendor_prefix.as_str())?
            .strip_prefix('/')?;
        let is_reference =
            token.len() == REFERENCE_TOKEN_LEN && token.chars().all(|c| c.is_ascii_hexdigit());
        is_reference.then(|| token.to_string())
    }

    /// URL path that serves `reference` without an alias.
    pub fn direct_path(&self, reference: &str) -> String {
        format!("/{}/{}", self.vendor_prefix, reference)
    }

    fn serve(
        &self,
        request: &RequestRecord,
        resolved: &str,
        data_ref: DataRef,
        header: &mut dyn FnMut(&str),
    ) -> Result<Reply> {
        let reference = data_ref.reference();

        // Held from load to re-persist so concurrent serves of one sequence
        // never observe the same cursor.
        let guard = self.dir.lock()?;
        let Some(mut response) = self.dir.responses().load_optional(reference)? else {
            drop(guard);
            let data_path = self.dir.file(reference);
            warn!(resolved, data_path = %data_path.display(), "Referenced response is missing");
            return Ok(Reply {
                status: 404,
                body: format!(
                    "{}: Resource '{}' for '{}' not found!\n",
                    self.vendor_prefix,
                    data_path.display(),
                    resolved
                ),
                outcome: Outcome::NotFound,
            });
        };

        let status = response.status(request);
        for entry in response.headers(request) {
            header(&entry.line());
        }
        let body = response.body(request);
        let delay = response.delay();

        let advanced = match response.as_sequenced() {
            Some(sequenced) => {
                sequenced.advance();
                debug!(reference, position = sequenced.position(), "Advanced sequence");
                true
            }
            None => false,
        };
        if advanced {
            self.dir.responses().store(&response)?;
            metrics::record_sequence_advance();
        }
        drop(guard);

        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            debug!(delay_ms = %delay.as_millis(), "Delaying response");
            std::thread::sleep(delay);
        }

        Ok(Reply {
            status,
            body,
            outcome: data_ref.outcome(),
        })
    }

    fn echo(&self, request: &RequestRecord, header: &mut dyn FnMut(&str)) -> Result<Reply> {
        header("Content-Type: application/json");
        let body = request
            .to_json_pretty()
            .map_err(|source| StoreError::Encode {
                what: "request echo",
                source,
            })?;
        Ok(Reply {
            status: 200,
            body,
            outcome: Outcome::Echo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> (tempfile::TempDir, Dispatcher) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::create(tmp.path()).unwrap();
        (tmp, Dispatcher::new(dir))
    }

    #[test]
    fn test_direct_reference_shape() {
        let (_tmp, d) = dispatcher();
        let token = "0123456789abcdefABCDEF0123456789";
        assert_eq!(
            d.direct_reference(&format!("/VND.Mockdir/{token}")).as_deref(),
            Some(token)
        );
        assert_eq!(d.direct_reference("/VND.Mockdir/0123"), None);
        assert_eq!(
            d.direct_reference(&format!("/VND.Mockdir/{token}/extra")),
            None
        );
        assert_eq!(d.direct_reference(&format!("/other/{token}")), None);
        assert_eq!(
            d.direct_reference("/VND.Mockdir/0123456789abcdef0123456789abcdeg"),
            None
        );
    }

    #[test]
    fn test_direct_path_roundtrip() {
        let (_tmp, d) = dispatcher();
        let reference = "0123456789abcdef0123456789abcdef";
        let path = d.direct_path(reference);
        assert_eq!(path, format!("/VND.Mockdir/{reference}"));
        assert_eq!(d.direct_reference(&path).as_deref(), Some(reference));
    }

    #[test]
    fn test_custom_vendor_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let d = Dispatcher::with_vendor_prefix(StateDir::create(tmp.path()).unwrap(), "acme");
        let token = "0123456789abcdef0123456789abcdef";
        assert!(d.direct_reference(&format!("/acme/{token}")).is_some());
        assert!(d.direct_reference(&format!("/VND.Mockdir/{token}")).is_none());
    }

    #[test]
    fn test_echo_when_nothing_resolves() {
        let (_tmp, d) = dispatcher();
        let mut headers = Vec::new();
        let request = RequestRecord::get("/nothing/here?x=1");
        let reply = d
            .handle(&request, &mut |line| headers.push(line.to_string()))
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.outcome, Outcome::Echo);
        assert_eq!(headers, vec!["Content-Type: application/json"]);
        assert_eq!(reply.body, request.to_json_pretty().unwrap());
    }

    #[test]
    fn test_every_request_is_journaled() {
        let (_tmp, d) = dispatcher();
        for _ in 0..3 {
            d.handle(&RequestRecord::get("/x"), &mut |_| {}).unwrap();
        }
        assert_eq!(d.state_dir().counter().current().unwrap(), 3);
        assert!(d.state_dir().journal().get(3).unwrap().is_some());
    }
}
