//! Prometheus exporter and HTTP request counters.
//!
//! Cache counters are recorded by `backoffice_cache::metrics`; this module
//! installs the recorder they report to and renders it for `GET /metrics`.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const HTTP_REQUESTS_TOTAL: &str = "backoffice_http_requests_total";

/// Install the Prometheus recorder. Returns `false` when it was already
/// installed or installation failed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // pull-based: /metrics renders the handle
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Prometheus text format, `None` before [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

pub fn record_http_request(method: &str, status: u16) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
