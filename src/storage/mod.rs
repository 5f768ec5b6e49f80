pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgReviewStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// Review row as read back from the `reviews` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredReview {
    pub id: i64,
    pub product_id: String,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

/// Validated review ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

/// Product identifier as supplied by the caller. Query strings always give
/// text; JSON bodies may carry either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductId {
    Text(String),
    Number(i64),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Text(id) => f.write_str(id),
            ProductId::Number(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

/// Opens one connection per invocation.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn connect(&self, database_url: &str) -> Result<Box<dyn ReviewConnection>, StoreError>;
}

#[async_trait]
pub trait ReviewConnection: Send {
    /// All reviews of a product, newest `created_at` first.
    async fn list_for_product(&mut self, product_id: &str) -> Result<Vec<StoredReview>, StoreError>;

    /// Insert and commit a review, returning the stored row.
    async fn insert(&mut self, review: &NewReview) -> Result<StoredReview, StoreError>;

    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
