use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

const LATENCY_BUCKETS: [f64; 10] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Records request count, latency and in-flight requests, labelled by the
/// route template so `/api/tournaments/:id` stays one series.
pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = matched_path
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    gauge!("http_requests_in_flight").increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_in_flight").decrement(1.0);

    let labels = [
        ("method", method),
        ("path", path),
        ("status", status_class(response.status().as_u16()).to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());

    response
}

/// `404` and `409` are one series each; everything else collapses to its class.
fn status_class(status: u16) -> &'static str {
    match status {
        404 => "404",
        409 => "409",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Install the global Prometheus recorder. Every series carries a `service`
/// label.
pub fn init_metrics(service_name: &str) -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .add_global_label("service", service_name)
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &LATENCY_BUCKETS,
        )?
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    describe_counter!("http_requests_total", "HTTP requests served");
    describe_histogram!("http_request_duration_seconds", Unit::Seconds, "HTTP request latency");
    describe_gauge!("http_requests_in_flight", "HTTP requests currently being served");

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_stay_low_cardinality() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(201), "2xx");
        assert_eq!(status_class(404), "404");
        assert_eq!(status_class(409), "409");
        assert_eq!(status_class(410), "4xx");
        assert_eq!(status_class(503), "5xx");
    }
}
