use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use service::DocumentStore;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::metrics;

pub mod collection;

/// Shared handler state: the record store behind the collection endpoints.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// Where things are mounted and served from.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub api_prefix: String,
    pub frontend_dir: String,
    pub max_body_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            api_prefix: "/api".into(),
            frontend_dir: "frontend".into(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl From<&configs::AppConfig> for RouterOptions {
    fn from(cfg: &configs::AppConfig) -> Self {
        Self {
            api_prefix: cfg.server.api_prefix.clone(),
            frontend_dir: cfg.storage.frontend_dir.clone(),
            max_body_bytes: cfg.server.max_body_bytes,
        }
    }
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_handler() -> (axum::http::StatusCode, String) {
    metrics::render()
}

pub fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Build the full application router: collection API, health, metrics and
/// the static roster page as fallback.
pub fn build_router(state: AppState, opts: &RouterOptions, cors: CorsLayer) -> Router {
    let index = format!("{}/index.html", opts.frontend_dir.trim_end_matches('/'));
    let static_dir = ServeDir::new(&opts.frontend_dir).fallback(ServeFile::new(index));

    let collection_routes = get(collection::fetch_collection)
        .post(collection::replace_collection)
        .put(collection::replace_collection);
    let api = Router::new()
        .route(&opts.api_prefix, collection_routes.clone())
        .route(&format!("{}/", opts.api_prefix), collection_routes)
        .layer(DefaultBodyLimit::max(opts.max_body_bytes));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        .fallback_service(static_dir)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx 以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
