//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prefixgate_core::{Error, Result};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::telemetry(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Count of prefix resolutions by outcome (`passthrough`, `redirect`,
/// `not_found`).
pub fn track_resolution(outcome: &'static str) {
    metrics::counter!("prefix_resolutions_total", "outcome" => outcome).increment(1);
}

pub fn track_trailing_slash_redirect() {
    metrics::counter!("trailing_slash_redirects_total").increment(1);
}

/// HTTP request count and latency. No path label: paths are user input and
/// unbounded.
pub fn track_request(method: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(latency_sec);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            track_resolution("redirect");
            track_resolution("redirect");
            track_trailing_slash_redirect();
            track_request("GET", 301, 0.001);
        });

        let rendered = handle.render();
        assert!(rendered.contains("prefix_resolutions_total{outcome=\"redirect\"} 2"));
        assert!(rendered.contains("trailing_slash_redirects_total 1"));
        let request_line = rendered
            .lines()
            .find(|line| line.starts_with("http_requests_total{"))
            .expect("http_requests_total rendered");
        assert!(request_line.contains("status=\"301\""));
        assert!(request_line.ends_with(" 1"));
    }
}
