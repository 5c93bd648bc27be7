// Generic request relay: validate an envelope, forward it to the backend,
// reflect the backend's answer.

pub mod client;
pub mod error;
pub mod route;

use std::time::Instant;

use serde_json::Value;

use crate::metrics;

pub use client::{BackendClient, BackendReply};
pub use error::RelayError;
pub use route::{is_present, parse_envelope, ActionRelay, Envelope, Relay, RelayRoute};

/// Forward one envelope through `route` and return the backend's JSON payload.
pub async fn execute(
    client: &BackendClient,
    route: &RelayRoute,
    envelope: Envelope,
) -> Result<Value, RelayError> {
    let outbound = route.prepare(envelope)?;
    tracing::debug!(route = %route.name(), method = %outbound.method, "relaying to backend");

    let started = Instant::now();
    let reply = client.send(&outbound).await;
    metrics::RELAY_DURATION_SECONDS
        .with_label_values(&[route.name()])
        .observe(started.elapsed().as_secs_f64());

    let reply = reply.inspect_err(|e| {
        tracing::error!(route = %route.name(), "backend unreachable: {e}");
    })?;

    interpret(route, reply.status, &reply.body)
}

/// Map a raw backend reply onto the relay contract.
pub fn interpret(route: &RelayRoute, status: u16, body: &[u8]) -> Result<Value, RelayError> {
    if !(200..300).contains(&status) {
        let message = backend_error_message(body)
            .unwrap_or_else(|| route.failure_message().to_string());
        tracing::warn!(route = %route.name(), status, "backend rejected request: {message}");
        metrics::BACKEND_FAILURES_TOTAL
            .with_label_values(&[route.name(), status.to_string().as_str()])
            .inc();
        return Err(RelayError::Backend { status, message });
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::error!(route = %route.name(), "backend success body is not JSON: {e}");
        RelayError::Decode(e)
    })
}

/// Best-effort extraction of the backend's error text: `error`, then FastAPI's `detail`.
fn backend_error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| value.get("detail").and_then(Value::as_str))
        .map(str::to_string)
}
