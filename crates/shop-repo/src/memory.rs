use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shop_types::domain::order::{Order, OrderStatus};
use shop_types::ports::order_repository::{OrderRepository, RepoError};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryRepo {
    pub map: Arc<DashMap<Uuid, Order>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            map: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        match self.map.entry(order.id) {
            Entry::Occupied(_) => Err(RepoError::DbError(format!(
                "order {} already exists",
                order.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(order)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.map.get(&id).map(|r| r.clone()))
    }

    async fn list(&self, buyer_id: Option<Uuid>) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .map
            .iter()
            .filter(|kv| buyer_id.map_or(true, |b| kv.value().buyer_id == b))
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn save(&self, order: Order, expected_version: i64) -> Result<Order, RepoError> {
        // The shard lock is held across the compare and the write.
        let Some(mut stored) = self.map.get_mut(&order.id) else {
            return Err(RepoError::NotFound(order.id));
        };
        if stored.version != expected_version {
            return Err(RepoError::Conflict {
                id: order.id,
                expected: expected_version,
                found: stored.version,
            });
        }
        *stored = order.clone();
        Ok(order)
    }

    async fn exists_with_product(
        &self,
        buyer_id: Uuid,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, RepoError> {
        Ok(self.map.iter().any(|kv| {
            let o = kv.value();
            o.buyer_id == buyer_id && o.status == status && o.contains_product(product_id)
        }))
    }
}
