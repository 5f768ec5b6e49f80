use crate::api::error::ReviewError;
use crate::api::review::handlers::ReviewHandler;
use crate::storage::{ProductId, StoredReview};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub reviews: Arc<ReviewHandler>,
}

/// Invocation as delivered by the hosting environment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRequest {
    pub http_method: Option<String>,
    pub query_string_parameters: Option<HashMap<String, String>>,
    pub body: Option<String>,
    /// Set by the HTTP host when the raw body could not be decoded as UTF-8
    #[serde(skip)]
    pub body_error: Option<String>,
}

impl HandlerRequest {
    /// HTTP method, `GET` when the host did not supply one
    pub fn method(&self) -> &str {
        self.http_method.as_deref().unwrap_or("GET")
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }
}

/// Response handed back to the hosting environment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HandlerResponse {
    /// JSON response carrying the CORS origin header
    pub fn json<T: Serialize>(status_code: u16, payload: &T) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("Internal server error: {}", e) }).to_string()
        });

        let headers = BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ]);

        Self {
            status_code,
            headers,
            body,
        }
    }

    /// CORS preflight answer
    pub fn preflight() -> Self {
        let headers = BTreeMap::from([
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
            (
                "Access-Control-Allow-Methods".to_string(),
                "GET, POST, OPTIONS".to_string(),
            ),
            (
                "Access-Control-Allow-Headers".to_string(),
                "Content-Type, Authorization".to_string(),
            ),
            ("Access-Control-Max-Age".to_string(), "86400".to_string()),
        ]);

        Self {
            status_code: 200,
            headers,
            body: String::new(),
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        response
    }
}

/// A review as shown to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewView {
    pub id: i64,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub date: String,
}

impl From<StoredReview> for ReviewView {
    fn from(row: StoredReview) -> Self {
        Self {
            id: row.id,
            date: format_date(&row),
            user_name: row.user_name,
            rating: row.rating,
            comment: row.comment,
        }
    }
}

/// Response for listing a product's reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewView>,
    pub average_rating: f64,
    pub total_reviews: usize,
}

impl ReviewList {
    pub fn from_rows(rows: Vec<StoredReview>) -> Self {
        let ratings: Vec<i32> = rows.iter().map(|row| row.rating).collect();
        let reviews: Vec<ReviewView> = rows.into_iter().map(ReviewView::from).collect();

        Self {
            average_rating: average_rating(&ratings),
            total_reviews: reviews.len(),
            reviews,
        }
    }
}

/// Response after adding a review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCreated {
    pub success: bool,
    pub review_id: i64,
    pub date: String,
    pub message: String,
}

impl From<&StoredReview> for ReviewCreated {
    fn from(row: &StoredReview) -> Self {
        Self {
            success: true,
            review_id: row.id,
            date: format_date(row),
            message: "Review added successfully".to_string(),
        }
    }
}

/// Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database_configured: bool,
}

/// Validated fields of a review submission
#[derive(Debug, Clone, PartialEq)]
pub struct AddReviewRequest {
    pub product_id: ProductId,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
}

impl AddReviewRequest {
    /// Parse and validate a raw POST body. An absent body reads as `{}`.
    pub fn from_body(body: Option<&str>) -> Result<Self, ReviewError> {
        let value: Value = serde_json::from_str(body.unwrap_or("{}"))
            .map_err(|e| ReviewError::Internal(e.to_string()))?;
        let fields = value
            .as_object()
            .ok_or_else(|| ReviewError::Internal("request body must be a JSON object".to_string()))?;

        Self::validate(fields)
    }

    fn validate(fields: &Map<String, Value>) -> Result<Self, ReviewError> {
        let product_id = match fields.get("product_id") {
            Some(Value::String(id)) if !id.is_empty() => Some(ProductId::Text(id.clone())),
            Some(Value::Number(id)) => id.as_i64().filter(|id| *id != 0).map(ProductId::Number),
            _ => None,
        };
        let user_name = trimmed_field(fields, "user_name");
        let comment = trimmed_field(fields, "comment");
        let rating = fields.get("rating").filter(|value| is_truthy(value));

        let (Some(product_id), Some(user_name), Some(rating), Some(comment)) =
            (product_id, user_name, rating, comment)
        else {
            return Err(ReviewError::BadRequest("All fields are required".to_string()));
        };

        // Only genuine JSON integers count; booleans, floats and numeric strings are rejected.
        let rating = rating
            .as_i64()
            .filter(|r| (1..=5).contains(r))
            .and_then(|r| i32::try_from(r).ok())
            .ok_or_else(|| ReviewError::BadRequest("Rating must be between 1 and 5".to_string()))?;

        Ok(Self {
            product_id,
            user_name,
            rating,
            comment,
        })
    }
}

fn trimmed_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn format_date(row: &StoredReview) -> String {
    row.created_at.format(DATE_FORMAT).to_string()
}

/// Mean rating rounded to one decimal place; 0 for no ratings.
///
/// Rounds the exact decimal value of the `f64` mean with ties to even, so
/// `1.25` becomes `1.2` and `1.45` (stored just below) becomes `1.4`.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    format!("{:.1}", mean).parse().unwrap_or(mean)
}
