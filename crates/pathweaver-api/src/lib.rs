//! Pathweaver: HTTP surface over the story engine.
//!
//! Exposes the route modules and shared state so integration tests can build
//! the same router as the binary.

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

/// Builds the full application router over `state`.
pub fn app(state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/stories", routes::stories::router())
        .with_state(state)
}

/// CORS policy for browser clients. An empty origin list allows any origin,
/// which suits local development only.
#[must_use]
pub fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
