// Prometheus metrics definitions for the arena relay.

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("arena_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Relayed calls, by route and outcome (ok, rejected, backend_error, internal_error).
    pub static ref RELAY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("arena_relay_requests_total", "Relayed requests by outcome"),
        &["route", "outcome"],
    )
    .unwrap();

    /// Non-success replies from the backend, by route and status code.
    pub static ref BACKEND_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("arena_backend_failures_total", "Backend non-success responses"),
        &["route", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Round-trip time to the backend in seconds, by route.
    pub static ref RELAY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "arena_relay_duration_seconds",
            "Backend round-trip duration in seconds",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["route"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
/// Registering twice is harmless; duplicates are ignored.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(RELAY_REQUESTS_TOTAL.clone()),
        Box::new(BACKEND_FAILURES_TOTAL.clone()),
        Box::new(RELAY_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("metric already registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: collapse the dynamic tail of
/// parameterized routes (session ids, voice ids) to `:id`.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let parent = if i > 0 { segments[i - 1] } else { "" };
            if segment.parse::<i64>().is_ok() || matches!(parent, "status" | "preview") {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/chat"), "/api/chat");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/api/tts/voices"), "/api/tts/voices");
    }

    #[test]
    fn test_normalize_path_with_ids() {
        assert_eq!(
            normalize_path("/api/tsunami/status/tsunami_20240101_120000"),
            "/api/tsunami/status/:id"
        );
        assert_eq!(normalize_path("/api/tts/preview/adam"), "/api/tts/preview/:id");
        assert_eq!(normalize_path("/api/things/42"), "/api/things/:id");
    }

    #[test]
    fn test_gather_metrics_returns_string() {
        register_metrics();
        register_metrics();
        RELAY_REQUESTS_TOTAL.with_label_values(&["chat", "ok"]).inc();
        let output = gather_metrics();
        assert!(output.contains("arena_relay_requests_total"));
    }

    #[test]
    fn test_metric_increments() {
        let before = BACKEND_FAILURES_TOTAL
            .with_label_values(&["gladiator.vote", "404"])
            .get();
        BACKEND_FAILURES_TOTAL
            .with_label_values(&["gladiator.vote", "404"])
            .inc();
        assert_eq!(
            BACKEND_FAILURES_TOTAL
                .with_label_values(&["gladiator.vote", "404"])
                .get(),
            before + 1
        );

        RELAY_DURATION_SECONDS
            .with_label_values(&["tts.generate"])
            .observe(0.25);
        API_REQUESTS_TOTAL
            .with_label_values(&["POST", "/api/chat", "200"])
            .inc();
    }
}
