// HTTP API: health, metrics, and the relayed arena routes.

pub mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, on, MethodRouter},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::metrics;
use crate::relay::{parse_envelope, BackendClient, Envelope, Relay, RelayError};

pub use routes::{relay_table, LocalRoute};

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
}

// ── Error helper ──────────────────────────────────────────────────────

pub fn json_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    with_layers(routes().with_state(state))
}

/// Full application: relay routes plus optional static UI fallback.
pub fn app(config: &Config) -> Result<Router, RelayError> {
    let state = AppState {
        backend: BackendClient::from_config(config)?,
    };
    let app = routes().with_state(state);
    let app = match &config.static_dir {
        Some(dir) => {
            tracing::info!("Serving static files from {}", dir.display());
            app.fallback_service(ServeDir::new(dir))
        }
        None => app.fallback(|| async { json_error(StatusCode::NOT_FOUND, "Not found") }),
    };
    Ok(with_layers(app))
}

fn routes() -> Router<AppState> {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    for local in relay_table() {
        tracing::debug!(path = local.path, "registering relay route");
        let has_params = !local.path_params().is_empty();
        app = app.route(local.path, relay_handler(local.method, local.relay, has_params));
    }
    app
}

/// Metrics and CORS wrap everything, fallback included.
fn with_layers(app: Router) -> Router {
    app.layer(middleware::from_fn(track_metrics))
        .layer(CorsLayer::permissive())
}

fn relay_handler(
    method: axum::routing::MethodFilter,
    relay: Relay,
    has_params: bool,
) -> MethodRouter<AppState> {
    let relay = Arc::new(relay);
    if has_params {
        on(
            method,
            move |State(state): State<AppState>,
                  Path(params): Path<HashMap<String, String>>,
                  Query(query): Query<HashMap<String, String>>,
                  body: Bytes| {
                let relay = relay.clone();
                async move { dispatch(&state, &relay, query, params, &body).await }
            },
        )
    } else {
        on(
            method,
            move |State(state): State<AppState>,
                  Query(query): Query<HashMap<String, String>>,
                  body: Bytes| {
                let relay = relay.clone();
                async move { dispatch(&state, &relay, query, HashMap::new(), &body).await }
            },
        )
    }
}

/// Parse the inbound body, merge query and path params, pick the backend route and relay.
///
/// Query parameters override body keys, and path parameters override both.
async fn dispatch(
    state: &AppState,
    relay: &Relay,
    query: HashMap<String, String>,
    params: HashMap<String, String>,
    body: &[u8],
) -> Response {
    let mut envelope: Envelope = match parse_envelope(body) {
        Ok(env) => env,
        Err(e) => {
            tracing::error!("unreadable request body: {e}");
            return e.into_response();
        }
    };
    for (key, value) in query.into_iter().chain(params) {
        envelope.insert(key, Value::String(value));
    }

    let route = match relay.resolve(&envelope) {
        Ok(route) => route,
        Err(e) => {
            metrics::RELAY_REQUESTS_TOTAL
                .with_label_values(&["unresolved", e.outcome()])
                .inc();
            return e.into_response();
        }
    };

    match crate::relay::execute(&state.backend, route, envelope).await {
        Ok(payload) => {
            metrics::RELAY_REQUESTS_TOTAL
                .with_label_values(&[route.name(), "ok"])
                .inc();
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => {
            metrics::RELAY_REQUESTS_TOTAL
                .with_label_values(&[route.name(), e.outcome()])
                .inc();
            e.into_response()
        }
    }
}

// ── Service handlers ──────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "arena-relay",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics::gather_metrics(),
    )
}

async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| metrics::normalize_path(req.uri().path()));

    let response = next.run(req).await;

    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    response
}
