use crate::api::error::ReviewError;
use crate::api::models::*;
use crate::storage::{NewReview, ReviewConnection, ReviewStore};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::Method,
};
use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Serves the reviews endpoint: preflight, listing and submission.
///
/// Holds no per-request state. Every non-preflight invocation opens its own
/// store connection and closes it before returning, whatever the outcome.
pub struct ReviewHandler {
    store: Arc<dyn ReviewStore>,
    database_url: Option<String>,
}

impl ReviewHandler {
    pub fn new(store: Arc<dyn ReviewStore>, database_url: Option<String>) -> Self {
        Self {
            store,
            database_url: database_url.filter(|url| !url.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.database_url.is_some()
    }

    pub async fn handle(&self, request: HandlerRequest) -> HandlerResponse {
        let method = request.method();
        if method == "OPTIONS" {
            return HandlerResponse::preflight();
        }

        match self.process(method, &request).await {
            Ok(response) => response,
            Err(err) => {
                if err.status_code() >= 500 {
                    error!(method, error = %err, "Review request failed");
                } else {
                    warn!(method, error = %err, "Review request rejected");
                }
                err.into()
            }
        }
    }

    async fn process(
        &self,
        method: &str,
        request: &HandlerRequest,
    ) -> Result<HandlerResponse, ReviewError> {
        let database_url = self
            .database_url
            .as_deref()
            .ok_or(ReviewError::NotConfigured)?;

        let mut conn = self.store.connect(database_url).await?;
        let outcome = dispatch(conn.as_mut(), method, request).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection");
        }

        outcome
    }
}

async fn dispatch(
    conn: &mut dyn ReviewConnection,
    method: &str,
    request: &HandlerRequest,
) -> Result<HandlerResponse, ReviewError> {
    match method {
        "GET" => list_reviews(conn, request).await,
        "POST" => add_review(conn, request).await,
        _ => Err(ReviewError::MethodNotAllowed),
    }
}

async fn list_reviews(
    conn: &mut dyn ReviewConnection,
    request: &HandlerRequest,
) -> Result<HandlerResponse, ReviewError> {
    let product_id = request
        .query_param("product_id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReviewError::BadRequest("product_id is required".to_string()))?;

    let rows = conn.list_for_product(product_id).await?;
    let list = ReviewList::from_rows(rows);

    debug!(
        product_id,
        total_reviews = list.total_reviews,
        average_rating = list.average_rating,
        "Listed reviews"
    );

    Ok(HandlerResponse::json(200, &list))
}

async fn add_review(
    conn: &mut dyn ReviewConnection,
    request: &HandlerRequest,
) -> Result<HandlerResponse, ReviewError> {
    if let Some(e) = &request.body_error {
        return Err(ReviewError::Internal(e.clone()));
    }
    let submission = AddReviewRequest::from_body(request.body.as_deref())?;

    let review = NewReview {
        product_id: submission.product_id,
        user_name: submission.user_name,
        rating: submission.rating,
        comment: submission.comment,
        created_at: Local::now().naive_local(),
    };

    let stored = conn.insert(&review).await?;

    info!(
        review_id = stored.id,
        product_id = %review.product_id,
        rating = review.rating,
        "Review added"
    );

    Ok(HandlerResponse::json(201, &ReviewCreated::from(&stored)))
}

/// Adapts an HTTP request on the reviews endpoint into a handler invocation.
pub async fn review_endpoint(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> HandlerResponse {
    let (body, body_error) = match String::from_utf8(body.to_vec()) {
        Ok(body) => ((!body.is_empty()).then_some(body), None),
        Err(e) => (None, Some(format!("request body is not valid UTF-8: {}", e))),
    };

    let request = HandlerRequest {
        http_method: Some(method.as_str().to_string()),
        query_string_parameters: Some(params),
        body,
        body_error,
    };

    state.reviews.handle(request).await
}
