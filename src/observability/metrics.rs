//! Metrics collection and exposition.
//!
//! # Metrics
//! - `stt_proxy_requests_total` (counter): requests by outcome and status
//! - `stt_proxy_request_duration_seconds` (histogram): time to response head
//! - `stt_proxy_upload_bytes` (histogram): audio bytes forwarded upstream
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels limited to outcome and status to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::error::Outcome;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished transcription request.
pub fn record_request(outcome: Outcome, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    metrics::counter!(
        "stt_proxy_requests_total",
        "outcome" => outcome.as_str(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "stt_proxy_request_duration_seconds",
        "outcome" => outcome.as_str()
    )
    .record(elapsed);
}

/// Record the size of an upload forwarded upstream.
pub fn record_upload(bytes: usize) {
    metrics::histogram!("stt_proxy_upload_bytes").record(bytes as f64);
}
