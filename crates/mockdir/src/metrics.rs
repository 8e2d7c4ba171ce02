//! Prometheus metrics for the dispatcher.
//!
//! Tracks how requests were resolved and how long dispatch took.
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec, Encoder,
    HistogramVec, TextEncoder,
};

lazy_static! {
    /// Requests by resolution outcome
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mockdir_requests_total",
        "Total number of requests handled by the dispatcher",
        &["outcome"]  // outcome: alias|direct|echo|not_found|error
    )
    .unwrap();

    /// Sequenced responses re-persisted after a serve
    pub static ref SEQUENCE_ADVANCES_TOTAL: Counter = register_counter!(
        "mockdir_sequence_advances_total",
        "Total number of sequenced responses advanced and re-persisted"
    )
    .unwrap();

    /// Dispatch duration, excluding response delays
    pub static ref DISPATCH_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mockdir_dispatch_duration_ms",
        "Time spent resolving and loading a response in milliseconds",
        &["outcome"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_dispatch(outcome: &str, duration_ms: f64) {
    REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    DISPATCH_DURATION_MS
        .with_label_values(&[outcome])
        .observe(duration_ms);
}

pub fn record_sequence_advance() {
    SEQUENCE_ADVANCES_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dispatch_outcomes() {
        record_dispatch("alias", 0.4);
        record_dispatch("echo", 1.2);
        record_dispatch("not_found", 0.1);

        let metrics = collect_metrics();
        assert!(metrics.contains("mockdir_requests_total"));
        assert!(metrics.contains("outcome=\"echo\""));
        assert!(metrics.contains("mockdir_dispatch_duration_ms"));
    }

    #[test]
    fn test_sequence_advance_counter() {
        let before = SEQUENCE_ADVANCES_TOTAL.get();
        record_sequence_advance();
        assert!(SEQUENCE_ADVANCES_TOTAL.get() >= before + 1.0);
        assert!(collect_metrics().contains("mockdir_sequence_advances_total"));
    }
}
