//! Response that answers with a different configured response on each serve.

use super::{
    content_reference, HeaderEntry, MockResponse, NotFoundResponse, Response, Sequenced,
};
use crate::request::RequestRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_past_end() -> Box<Response> {
    Box::new(Response::NotFound(NotFoundResponse::new()))
}

/// Serves `responses[cursor]`, then `past_end` once the list is exhausted.
///
/// The cursor is part of the persisted state but not of the reference, so the
/// same file is overwritten as the sequence advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceResponse {
    pub responses: Vec<Response>,
    #[serde(default)]
    pub cursor: usize,
    #[serde(default = "default_past_end")]
    pub past_end: Box<Response>,
}

#[derive(Serialize)]
struct SequenceIdentity {
    responses: Vec<String>,
    past_end: String,
}

impl SequenceResponse {
    pub fn new(responses: Vec<Response>) -> Self {
        Self {
            responses,
            cursor: 0,
            past_end: default_past_end(),
        }
    }

    pub fn with_past_end(mut self, past_end: impl Into<Response>) -> Self {
        self.past_end = Box::new(past_end.into());
        self
    }

    /// The response the next serve will use.
    pub fn current(&self) -> &Response {
        self.responses.get(self.cursor).unwrap_or(&self.past_end)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.responses.len()
    }
}

impl MockResponse for SequenceResponse {
    fn reference(&self) -> String {
        let identity = SequenceIdentity {
            responses: self.responses.iter().map(MockResponse::reference).collect(),
            past_end: self.past_end.reference(),
        };
        content_reference("sequence", &identity)
    }

    fn status(&self, request: &RequestRecord) -> u16 {
        self.current().status(request)
    }

    fn headers(&self, request: &RequestRecord) -> Vec<HeaderEntry> {
        self.current().headers(request)
    }

    fn body(&self, request: &RequestRecord) -> String {
        self.current().body(request)
    }

    fn delay(&self) -> Option<Duration> {
        self.current().delay()
    }

    fn as_sequenced(&mut self) -> Option<&mut dyn Sequenced> {
        Some(self)
    }
}

impl Sequenced for SequenceResponse {
    fn advance(&mut self) {
        if self.cursor < self.responses.len() {
            self.cursor += 1;
        }
    }

    fn position(&self) -> usize {
        self.cursor
    }
}
