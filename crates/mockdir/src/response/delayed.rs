//! Wait behavior for stored responses.

use super::{content_reference, HeaderEntry, MockResponse, Response, Sequenced};
use crate::request::RequestRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serves `inner` after a fixed delay. The dispatcher sleeps; the response
/// only reports how long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedResponse {
    pub delay_ms: u64,
    pub inner: Box<Response>,
}

#[derive(Serialize)]
struct DelayedIdentity {
    delay_ms: u64,
    inner: String,
}

impl DelayedResponse {
    pub fn new(inner: impl Into<Response>, delay: Duration) -> Self {
        Self {
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            inner: Box::new(inner.into()),
        }
    }
}

impl MockResponse for DelayedResponse {
    fn reference(&self) -> String {
        let identity = DelayedIdentity {
            delay_ms: self.delay_ms,
            inner: self.inner.reference(),
        };
        content_reference("delayed", &identity)
    }

    fn status(&self, request: &RequestRecord) -> u16 {
        self.inner.status(request)
    }

    fn headers(&self, request: &RequestRecord) -> Vec<HeaderEntry> {
        self.inner.headers(request)
    }

    fn body(&self, request: &RequestRecord) -> String {
        self.inner.body(request)
    }

    fn delay(&self) -> Option<Duration> {
        let own = Duration::from_millis(self.delay_ms);
        Some(own.saturating_add(self.inner.delay().unwrap_or_default()))
    }

    fn as_sequenced(&mut self) -> Option<&mut dyn Sequenced> {
        self.inner.as_sequenced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{SequenceResponse, StaticResponse};

    #[test]
    fn test_delegates_to_inner() {
        let delayed = DelayedResponse::new(
            StaticResponse::new("slow").with_status(203),
            Duration::from_millis(250),
        );
        let req = RequestRecord::get("/slow");
        assert_eq!(delayed.status(&req), 203);
        assert_eq!(delayed.body(&req), "slow");
        assert_eq!(delayed.delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_forwards_sequencing() {
        let mut delayed = DelayedResponse::new(
            SequenceResponse::new(vec![
                StaticResponse::new("a").into(),
                StaticResponse::new("b").into(),
            ]),
            Duration::from_millis(10),
        );
        let req = RequestRecord::get("/");
        delayed.as_sequenced().unwrap().advance();
        assert_eq!(delayed.body(&req), "b");
    }

    #[test]
    fn test_plain_inner_is_not_sequenced() {
        let mut delayed = DelayedResponse::new(StaticResponse::new("a"), Duration::ZERO);
        assert!(delayed.as_sequenced().is_none());
    }

    #[test]
    fn test_reference_depends_on_delay() {
        let a = DelayedResponse::new(StaticResponse::new("a"), Duration::from_millis(1));
        let b = DelayedResponse::new(StaticResponse::new("a"), Duration::from_millis(2));
        assert_ne!(a.reference(), b.reference());
    }

    #[test]
    fn test_oversized_delay_saturates() {
        let delayed = DelayedResponse::new(StaticResponse::new("a"), Duration::MAX);
        assert_eq!(delayed.delay_ms, u64::MAX);
        assert_eq!(delayed.delay(), Some(Duration::from_millis(u64::MAX)));
    }
}
