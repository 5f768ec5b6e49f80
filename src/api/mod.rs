pub mod error;
pub mod models;
pub mod review;

// Re-exports
pub use models::*;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

// Health handler (simple, keep here)
pub async fn health_handler(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    Json(models::HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database_configured: state.reviews.is_configured(),
    })
}

/// Full application router. Everything except `GET /health` reaches the
/// reviews handler, so preflights and unsupported methods are answered everywhere.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(health_handler).fallback(review::handlers::review_endpoint),
        )
        .merge(review::routes())
        .fallback(review::handlers::review_endpoint)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
