use crate::api::models::{ErrorBody, HandlerResponse};
use crate::storage::StoreError;
use thiserror::Error;

/// Failure of a single review invocation
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Database connection not configured")]
    NotConfigured,

    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ReviewError {
    pub fn status_code(&self) -> u16 {
        match self {
            ReviewError::BadRequest(_) => 400,
            ReviewError::MethodNotAllowed => 405,
            ReviewError::NotConfigured | ReviewError::Store(_) | ReviewError::Internal(_) => 500,
        }
    }
}

impl From<ReviewError> for HandlerResponse {
    fn from(err: ReviewError) -> Self {
        HandlerResponse::json(
            err.status_code(),
            &ErrorBody {
                error: err.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ReviewError::NotConfigured.status_code(), 500);
        assert_eq!(ReviewError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(ReviewError::MethodNotAllowed.status_code(), 405);
        assert_eq!(ReviewError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_store_error_message_is_prefixed() {
        let err = ReviewError::from(StoreError::Other("connection refused".into()));
        assert_eq!(err.to_string(), "Database error: connection refused");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_error_response_body() {
        let response = HandlerResponse::from(ReviewError::MethodNotAllowed);
        assert_eq!(response.status_code, 405);
        assert_eq!(response.body, r#"{"error":"Method not allowed"}"#);
        assert_eq!(response.headers["Content-Type"], "application/json");
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    }
}
