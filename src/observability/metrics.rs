//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): metered requests by method
//! - `gateway_request_bytes` (histogram): metadata + body bytes per request
//! - `gateway_request_metadata_bytes` (histogram): request line + headers
//! - `gateway_request_body_truncated_total` (counter): bodies cut at the limit
//!
//! # Design Decisions
//! - Recorded once per request, after the body has been read
//! - Low-overhead metric updates (atomic operations)

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::http::facade::SizeMeter;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the final size of one request.
pub fn record_request_size(method: &str, meter: &SizeMeter) {
    counter!("gateway_requests_total", "method" => method.to_string()).increment(1);
    histogram!("gateway_request_bytes").record(meter.size() as f64);
    histogram!("gateway_request_metadata_bytes").record(meter.metadata_size() as f64);
}

pub fn record_truncated_body() {
    counter!("gateway_request_body_truncated_total").increment(1);
}
