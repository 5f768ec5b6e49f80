use super::{NewReview, ReviewConnection, ReviewStore, StoreError, StoredReview};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::debug;

// Projected columns are cast so serial or bigserial ids and integer or text
// `product_id` columns all decode into `StoredReview`.
//
// The product id is always bound as text and converted through the table's
// own row type, so the column's input function parses it (`'05'` matches 5 on
// an integer column) and the comparison stays on the bare, indexable column.
const SELECT_REVIEWS: &str = r#"
    SELECT id::bigint AS id,
           product_id::text AS product_id,
           user_name,
           rating::int AS rating,
           comment,
           created_at::timestamp AS created_at
    FROM reviews
    WHERE product_id = (
        SELECT typed.product_id
        FROM json_populate_record(NULL::reviews, json_build_object('product_id', $1::text)) AS typed
    )
    ORDER BY created_at DESC
"#;

const INSERT_REVIEW: &str = r#"
    INSERT INTO reviews (product_id, user_name, rating, comment, created_at)
    SELECT typed.product_id, $2, $3, $4, $5
    FROM json_populate_record(NULL::reviews, json_build_object('product_id', $1::text)) AS typed
    RETURNING id::bigint AS id,
              product_id::text AS product_id,
              user_name,
              rating::int AS rating,
              comment,
              created_at::timestamp AS created_at
"#;

/// Postgres-backed store, one `PgConnection` per invocation
#[derive(Debug, Default, Clone, Copy)]
pub struct PgReviewStore;

impl PgReviewStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn connect(&self, database_url: &str) -> Result<Box<dyn ReviewConnection>, StoreError> {
        let conn = PgConnection::connect(database_url).await?;
        debug!("Opened database connection");
        Ok(Box::new(PgReviewConnection { conn }))
    }
}

pub struct PgReviewConnection {
    conn: PgConnection,
}

#[async_trait]
impl ReviewConnection for PgReviewConnection {
    async fn list_for_product(&mut self, product_id: &str) -> Result<Vec<StoredReview>, StoreError> {
        let rows = sqlx::query_as::<_, StoredReview>(SELECT_REVIEWS)
            .bind(product_id)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows)
    }

    async fn insert(&mut self, review: &NewReview) -> Result<StoredReview, StoreError> {
        let mut tx = self.conn.begin().await?;
        let row = sqlx::query_as::<_, StoredReview>(INSERT_REVIEW)
            .bind(review.product_id.to_string())
            .bind(review.user_name.as_str())
            .bind(review.rating)
            .bind(review.comment.as_str())
            .bind(review.created_at)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(row)
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.conn.close().await?;
        debug!("Closed database connection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ProductId;
    use chrono::Local;

    // Runs against a real server only when TEST_DATABASE_URL is set. The
    // temporary table shadows any `reviews` table for this session.
    async fn integer_keyed_connection() -> Option<PgReviewConnection> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let mut conn = PgConnection::connect(&url).await.unwrap();
        sqlx::query(
            r#"
            CREATE TEMPORARY TABLE reviews (
                id SERIAL PRIMARY KEY,
                product_id INTEGER NOT NULL,
                user_name VARCHAR(255) NOT NULL,
                rating INTEGER NOT NULL,
                comment TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&mut conn)
        .await
        .unwrap();
        Some(PgReviewConnection { conn })
    }

    fn review(product_id: ProductId, rating: i32) -> NewReview {
        NewReview {
            product_id,
            user_name: "Anna".to_string(),
            rating,
            comment: "Soft".to_string(),
            created_at: Local::now().naive_local(),
        }
    }

    #[test]
    fn test_product_id_bound_as_text() {
        assert_eq!(ProductId::Number(5).to_string(), "5");
        assert_eq!(ProductId::Text("05".to_string()).to_string(), "05");
    }

    #[test]
    fn test_queries_compare_on_bare_column() {
        assert!(SELECT_REVIEWS.contains("WHERE product_id = ("));
        assert!(!SELECT_REVIEWS.contains("product_id::text = $1"));
        assert!(INSERT_REVIEW.contains("json_populate_record(NULL::reviews"));
    }

    #[tokio::test]
    async fn test_text_product_id_on_integer_column() {
        let Some(mut conn) = integer_keyed_connection().await else {
            return;
        };

        let stored = conn
            .insert(&review(ProductId::Text("5".to_string()), 4))
            .await
            .unwrap();
        assert_eq!(stored.product_id, "5");
        conn.insert(&review(ProductId::Number(5), 2)).await.unwrap();
        conn.insert(&review(ProductId::Number(6), 1)).await.unwrap();

        let rows = conn.list_for_product("05").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.product_id == "5"));
        assert!(rows[0].created_at >= rows[1].created_at);

        Box::new(conn).close().await.unwrap();
    }
}
