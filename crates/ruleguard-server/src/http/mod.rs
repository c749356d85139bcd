//! HTTP transport adapter: thin `axum` routing over the application layer.

pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the full `axum` router for the service.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/v1/rules", post(handlers::create_rule).get(handlers::list_rules))
        .route(
            "/v1/rules/{id}",
            get(handlers::get_rule).put(handlers::update_rule).delete(handlers::delete_rule),
        )
        .route("/v1/rules/{id}/enable", post(handlers::enable_rule))
        .route("/v1/rules/{id}/disable", post(handlers::disable_rule))
        .route("/v1/spans", post(handlers::ingest_spans))
        .route("/v1/violations", get(handlers::list_violations))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
