//! Structured logging configuration.
//!
//! Installs a `tracing` subscriber for the server. Records emitted by the
//! engine through the `log` facade are forwarded into the same output.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use rt_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `init` also installs the log -> tracing bridge (tracing-log feature)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed API request
///
/// # Arguments
///
/// * `request_id` - Correlation id of the request
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if status_code >= 500 {
        tracing::error!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

/// Log a bracket-level operation and its outcome
pub fn log_bracket_operation(operation: &str, category_id: i32, division_id: i32, outcome: &str) {
    tracing::info!(
        operation = operation,
        category_id = category_id,
        division_id = division_id,
        outcome = outcome,
        "Bracket operation"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_api_request() {
        // Just ensure it doesn't panic
        log_api_request("abc", "GET", "/api/v1/teams", 200, 45);
        log_api_request("def", "POST", "/api/v1/brackets/1/1/advance", 503, 5000);
    }

    #[test]
    fn test_log_bracket_operation() {
        log_bracket_operation("advance", 1, 2, "Advanced 4 winners to Stage 2");
    }
}
