use bytes::Bytes;
use http_body_util::Full;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use std::str::FromStr;
use tracing::warn;

/// Assembles a hyper response from what the dispatcher produced.
pub struct ReplyBuilder {
    status: StatusCode,
    body: Option<String>,
    headers: HeaderMap,
}

impl ReplyBuilder {
    pub fn new(status_code: StatusCode) -> Self {
        ReplyBuilder {
            status: status_code,
            body: None,
            headers: Default::default(),
        }
    }

    /// Builder for a numeric status; out-of-range codes become 500.
    pub fn from_code(code: u16) -> Self {
        let status = StatusCode::from_u16(code).unwrap_or_else(|_| {
            warn!(code, "Response produced an invalid status code");
            StatusCode::INTERNAL_SERVER_ERROR
        });
        Self::new(status)
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
                self
            }
            _ => {
                warn!(name, "Skipping header that is not valid HTTP");
                self
            }
        }
    }

    /// Apply one formatted header line. `HTTP/x.y <code> ...` status lines
    /// override the status; lines without a `:` are skipped.
    pub fn header_line(mut self, line: &str) -> Self {
        if line.starts_with("HTTP/") {
            if let Some(code) = line
                .split_whitespace()
                .nth(1)
                .and_then(|c| c.parse::<u16>().ok())
                .and_then(|c| StatusCode::from_u16(c).ok())
            {
                self.status = code;
                return self;
            }
        }
        match line.split_once(':') {
            Some((name, value)) => self.header(name.trim(), value.trim()),
            None => {
                warn!(line, "Skipping header line without a name");
                self
            }
        }
    }

    pub fn header_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .fold(self, |builder, line| builder.header_line(line.as_ref()))
    }

    pub fn build_full(self) -> Response<Full<Bytes>> {
        let payload = self.body.map(Bytes::from).unwrap_or_default();
        let mut response = Response::new(Full::new(payload));
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        response
    }
}
