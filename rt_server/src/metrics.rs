//! Prometheus metrics for monitoring tournament server health and activity.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`) for scraping by monitoring systems.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Tournament Metrics**: Draws, advancements, recorded results
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rt_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/matches/{id}/result", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template, not the raw URI, to keep
/// label cardinality bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Count a stage draw (first stage or advancement).
pub fn stages_generated_total(category_id: i32) {
    metrics::counter!("stages_generated_total",
        "category" => category_id.to_string()
    )
    .increment(1);
}

/// Count a recorded match result.
pub fn match_results_total() {
    metrics::counter!("match_results_total").increment(1);
}

/// Count an advancement request by its outcome.
pub fn advance_outcomes_total(outcome: &str) {
    metrics::counter!("advance_outcomes_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Count a rejected engine operation by error kind.
pub fn tournament_errors_total(kind: &str) {
    metrics::counter!("tournament_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}
