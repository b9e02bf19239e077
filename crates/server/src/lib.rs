pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use config::{AppConfig, SERVICE_NAME};
pub use error::ApiError;
pub use state::AppState;

/// Build the HTTP router with every API route mounted under
/// `server.api_prefix`.
pub fn app(state: AppState, server: &config::ServerConfig) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health))
        .route("/image", post(routes::upload_image))
        .route("/receipt", post(routes::upload_receipt))
        .route("/store-analysis", post(routes::store_analysis))
        .route("/insight", get(routes::insight));

    let prefix = server.route_prefix();
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
