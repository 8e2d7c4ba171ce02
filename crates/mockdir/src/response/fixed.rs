//! Fixed responses.

use super::{content_reference, HeaderEntry, MockResponse, DEFAULT_VENDOR_PREFIX};
use crate::request::RequestRecord;
use serde::{Deserialize, Serialize};

fn default_status() -> u16 {
    200
}

/// Same status, headers and body for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
    #[serde(default)]
    pub body: String,
}

impl StaticResponse {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            status: default_status(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderEntry::named(name, value));
        self
    }

    pub fn with_raw_header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(HeaderEntry::raw(line));
        self
    }
}

impl MockResponse for StaticResponse {
    fn reference(&self) -> String {
        content_reference("static", self)
    }

    fn status(&self, _request: &RequestRecord) -> u16 {
        self.status
    }

    fn headers(&self, _request: &RequestRecord) -> Vec<HeaderEntry> {
        self.headers.clone()
    }

    fn body(&self, _request: &RequestRecord) -> String {
        self.body.clone()
    }
}

fn default_vendor() -> String {
    DEFAULT_VENDOR_PREFIX.to_string()
}

/// 404 naming the requested path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundResponse {
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

impl NotFoundResponse {
    pub fn new() -> Self {
        Self {
            vendor: default_vendor(),
        }
    }

    pub fn with_vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
        }
    }
}

impl Default for NotFoundResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResponse for NotFoundResponse {
    fn reference(&self) -> String {
        content_reference("not_found", self)
    }

    fn status(&self, _request: &RequestRecord) -> u16 {
        404
    }

    fn headers(&self, _request: &RequestRecord) -> Vec<HeaderEntry> {
        Vec::new()
    }

    fn body(&self, request: &RequestRecord) -> String {
        format!("{}: Resource '{}' not found!\n", self.vendor, request.path())
    }
}
