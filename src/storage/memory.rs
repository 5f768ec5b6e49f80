//! In-memory store double used by tests.

use super::{NewReview, ReviewConnection, ReviewStore, StoreError, StoredReview};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Shared {
    rows: Mutex<Vec<StoredReview>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    fail_connect: AtomicBool,
    fail_queries: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryReviewStore {
    shared: Arc<Shared>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<StoredReview>) -> Self {
        let store = Self::new();
        *store.shared.rows.lock().unwrap() = rows;
        store
    }

    pub fn rows(&self) -> Vec<StoredReview> {
        self.shared.rows.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn fail_connect(&self) {
        self.shared.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn fail_queries(&self) {
        self.shared.fail_queries.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn connect(&self, _database_url: &str) -> Result<Box<dyn ReviewConnection>, StoreError> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(StoreError::Other("connection refused".to_string()));
        }
        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryConnection {
    shared: Arc<Shared>,
}

impl MemoryConnection {
    fn check(&self) -> Result<(), StoreError> {
        if self.shared.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Other("relation \"reviews\" does not exist".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewConnection for MemoryConnection {
    async fn list_for_product(&mut self, product_id: &str) -> Result<Vec<StoredReview>, StoreError> {
        self.check()?;
        let mut rows: Vec<StoredReview> = self
            .shared
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.product_id == product_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&mut self, review: &NewReview) -> Result<StoredReview, StoreError> {
        self.check()?;
        let mut rows = self.shared.rows.lock().unwrap();
        let id = rows.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        let row = StoredReview {
            id,
            product_id: review.product_id.to_string(),
            user_name: review.user_name.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: review.created_at,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
