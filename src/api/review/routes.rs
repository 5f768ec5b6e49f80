use crate::api::models::AppState;
use crate::api::review::handlers::review_endpoint;
use axum::{routing::any, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", any(review_endpoint))
}
