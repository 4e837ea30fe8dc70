//! REST surface over the metrics aggregator

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use perf_metrics::{AggregatorConfig, MetricsAggregator};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared handler state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Aggregator fed by the host
    pub metrics: MetricsAggregator,
}

impl AppState {
    /// Wrap an aggregator handle
    #[must_use]
    pub const fn new(metrics: MetricsAggregator) -> Self {
        Self { metrics }
    }
}

/// `?id=` filter for row endpoints
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    /// Component or operation identifier
    pub id: Option<String>,
}

/// `?url=` filter for network samples
#[derive(Debug, Default, Deserialize)]
pub struct UrlQuery {
    /// URL substring
    pub url: Option<String>,
}

/// `?message_type=` filter for socket samples
#[derive(Debug, Default, Deserialize)]
pub struct MessageTypeQuery {
    /// Exact message type
    pub message_type: Option<String>,
}

/// Body of `POST /api/enabled`
#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    /// New enabled flag
    pub enabled: bool,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/summary", get(summary))
        .route("/api/components", get(components))
        .route("/api/operations", get(operations))
        .route("/api/network", get(network))
        .route("/api/socket", get(socket))
        .route("/api/config", get(current_config))
        .route("/api/clear", post(clear))
        .route("/api/enabled", post(set_enabled))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn not_found(kind: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no {kind} named {id}") })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    "OK"
}

async fn summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_summary())
}

async fn components(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    match query.id {
        Some(id) => match state.metrics.get_component_stat(&id) {
            Some(row) => Json(row).into_response(),
            None => not_found("component", &id),
        },
        None => Json(state.metrics.get_component_stats()).into_response(),
    }
}

async fn operations(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    match query.id {
        Some(id) => match state.metrics.get_operation_stat(&id) {
            Some(row) => Json(row).into_response(),
            None => not_found("operation", &id),
        },
        None => Json(state.metrics.get_operation_stats()).into_response(),
    }
}

async fn network(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> impl IntoResponse {
    Json(state.metrics.get_network_samples(query.url.as_deref()))
}

async fn socket(
    State(state): State<AppState>,
    Query(query): Query<MessageTypeQuery>,
) -> impl IntoResponse {
    Json(state.metrics.get_socket_samples(query.message_type.as_deref()))
}

async fn current_config(State(state): State<AppState>) -> Json<AggregatorConfig> {
    Json(state.metrics.config())
}

async fn clear(State(state): State<AppState>) -> StatusCode {
    state.metrics.clear_all();
    info!("Metrics cleared via API");
    StatusCode::NO_CONTENT
}

async fn set_enabled(
    State(state): State<AppState>,
    Json(request): Json<EnabledRequest>,
) -> Json<AggregatorConfig> {
    state.metrics.set_enabled(request.enabled);
    info!(enabled = request.enabled, "Metrics recording toggled via API");
    Json(state.metrics.config())
}
