//! Prometheus metrics for the proxy endpoints.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder (once per process) and return its handle.
///
/// If another recorder is already installed, the returned handle renders an
/// empty exposition instead of failing.
pub fn init() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                warn!("Metrics recorder already installed: {}", e);
            }
            handle
        })
        .clone()
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "hls_relay_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("hls_relay_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error() {
    counter!("hls_relay_upstream_errors_total").increment(1);
}

pub fn record_origin_denied() {
    counter!("hls_relay_origin_denied_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let _first = init();
        let second = init();
        record_request("manifest", 200);
        assert!(second.render().contains("hls_relay_requests_total"));
    }
}
