//! Mock responses and the capability set the dispatcher serves through.
//!
//! A response produces a status, an ordered header list and a body for the
//! request being handled. Responses that also implement [`Sequenced`] change
//! what they serve each time they are advanced; the dispatcher persists them
//! again after every serve so the cursor survives between requests.
//!
//! # Module Structure
//!
//! - `fixed` - Fixed and not-found responses
//! - `sequence` - Response that steps through a list of responses
//! - `delayed` - Wrapper adding latency before the body is written

mod delayed;
mod fixed;
mod sequence;

pub use delayed::DelayedResponse;
pub use fixed::{NotFoundResponse, StaticResponse};
pub use sequence::SequenceResponse;

use crate::request::RequestRecord;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Vendor prefix used by the direct-reference URL convention and by the
/// not-found body.
pub const DEFAULT_VENDOR_PREFIX: &str = "VND.Mockdir";

/// One header entry. Raw entries are emitted verbatim as a header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderEntry {
    Raw(String),
    Named { name: String, value: String },
}

impl HeaderEntry {
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        HeaderEntry::Named {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn raw(line: impl Into<String>) -> Self {
        HeaderEntry::Raw(line.into())
    }

    /// The formatted header line handed to the header sink.
    pub fn line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HeaderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderEntry::Raw(line) => f.write_str(line),
            HeaderEntry::Named { name, value } => write!(f, "{name}: {value}"),
        }
    }
}

/// What the dispatcher needs from a stored response.
pub trait MockResponse {
    /// Stable content identity; the response file is named after it.
    fn reference(&self) -> String;

    fn status(&self, request: &RequestRecord) -> u16;

    fn headers(&self, request: &RequestRecord) -> Vec<HeaderEntry>;

    fn body(&self, request: &RequestRecord) -> String;

    /// Latency to add before the body is written.
    fn delay(&self) -> Option<Duration> {
        None
    }

    /// Capability query for responses that step through several answers.
    fn as_sequenced(&mut self) -> Option<&mut dyn Sequenced> {
        None
    }
}

/// A response with an internal cursor.
pub trait Sequenced {
    /// Move to the next configured answer.
    fn advance(&mut self);

    fn position(&self) -> usize;
}

/// Every response kind that can be persisted in a state directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Static(StaticResponse),
    NotFound(NotFoundResponse),
    Sequence(SequenceResponse),
    Delayed(DelayedResponse),
}

impl Response {
    fn inner(&self) -> &dyn MockResponse {
        match self {
            Response::Static(r) => r,
            Response::NotFound(r) => r,
            Response::Sequence(r) => r,
            Response::Delayed(r) => r,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn MockResponse {
        match self {
            Response::Static(r) => r,
            Response::NotFound(r) => r,
            Response::Sequence(r) => r,
            Response::Delayed(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Response::Static(_) => "static",
            Response::NotFound(_) => "not_found",
            Response::Sequence(_) => "sequence",
            Response::Delayed(_) => "delayed",
        }
    }
}

impl MockResponse for Response {
    fn reference(&self) -> String {
        self.inner().reference()
    }

    fn status(&self, request: &RequestRecord) -> u16 {
        self.inner().status(request)
    }

    fn headers(&self, request: &RequestRecord) -> Vec<HeaderEntry> {
        self.inner().headers(request)
    }

    fn body(&self, request: &RequestRecord) -> String {
        self.inner().body(request)
    }

    fn delay(&self) -> Option<Duration> {
        self.inner().delay()
    }

    fn as_sequenced(&mut self) -> Option<&mut dyn Sequenced> {
        self.inner_mut().as_sequenced()
    }
}

impl From<StaticResponse> for Response {
    fn from(r: StaticResponse) -> Self {
        Response::Static(r)
    }
}

impl From<NotFoundResponse> for Response {
    fn from(r: NotFoundResponse) -> Self {
        Response::NotFound(r)
    }
}

impl From<SequenceResponse> for Response {
    fn from(r: SequenceResponse) -> Self {
        Response::Sequence(r)
    }
}

impl From<DelayedResponse> for Response {
    fn from(r: DelayedResponse) -> Self {
        Response::Delayed(r)
    }
}

/// md5 hex over a kind tag and the JSON of the identifying fields.
pub(crate) fn content_reference(kind: &str, identity: &impl Serialize) -> String {
    let mut hasher = Md5::new();
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(serde_json::to_vec(identity).unwrap_or_default());
    hex::encode(hasher.finalize())
}
