use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error("order {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { id: Uuid, expected: i64, found: i64 },
}

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    async fn create(&self, order: Order) -> Result<Order, RepoError>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    /// Newest first. `buyer_id` narrows the listing to one buyer.
    async fn list(&self, buyer_id: Option<Uuid>) -> Result<Vec<Order>, RepoError>;
    /// Replaces the stored order only if its version still equals `expected_version`.
    async fn save(&self, order: Order, expected_version: i64) -> Result<Order, RepoError>;
    async fn exists_with_product(
        &self,
        buyer_id: Uuid,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, RepoError>;
}
