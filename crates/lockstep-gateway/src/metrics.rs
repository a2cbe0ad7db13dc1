//! Prometheus metrics recording and endpoint.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus metrics recorder and return the handle for rendering.
///
/// Returns `None` when a recorder is already installed in this process.
pub fn install_prometheus_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(%e, "Prometheus recorder not installed");
            None
        }
    }
}

/// Record a first-touch request from a participant.
pub fn record_touch(participant: &str) {
    let labels = [("participant", participant.to_string())];
    metrics::counter!("touches_total", &labels).increment(1);
}

/// Record the focus percent of the latest score request.
pub fn record_focus(percent: f64) {
    metrics::gauge!("focus_percent").set(percent);
}

/// Record an HTTP request with its duration.
pub fn record_request(route: &str, duration_secs: f64) {
    let labels = [("route", route.to_string())];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels).record(duration_secs);
}

/// Record an error of a given kind.
pub fn record_error(kind: &str) {
    let labels = [("kind", kind.to_string())];
    metrics::counter!("errors_total", &labels).increment(1);
}

/// Middleware timing every request by its matched route.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(req).await;
    record_request(&route, start.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_touch_does_not_panic() {
        // The metrics crate uses a no-op recorder when none is installed
        record_touch("presenter");
        record_touch("follower");
    }

    #[test]
    fn test_record_focus_and_request_do_not_panic() {
        record_focus(50.0);
        record_request("/api/score", 0.002);
    }

    #[test]
    fn test_record_error_does_not_panic() {
        record_error("lesson_not_found");
    }
}
