use crate::errors::AppError;
use async_trait::async_trait;
use shop_types::domain::order::{AdminUpdate, Order, OrderStatus, TransitionError};
use shop_types::domain::placement::OrderDraft;
use shop_types::ports::order_repository::OrderRepository;
use shop_types::ports::review_eligibility::ReviewEligibility;
use uuid::Uuid;

pub struct OrderService<R: OrderRepository> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn place_order(&self, draft: OrderDraft) -> Result<Order, AppError> {
        let order = Order::place(draft).inspect_err(|e| {
            tracing::info!(problems = e.0.len(), "order placement rejected");
        })?;
        let order = self.repo.create(order).await?;
        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            total_cents = order.total_cents,
            "order placed"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", id)))
    }

    pub async fn list_orders(&self, buyer_id: Option<Uuid>) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list(buyer_id).await?)
    }

    pub async fn update_order_admin(
        &self,
        id: Uuid,
        update: AdminUpdate,
    ) -> Result<Order, AppError> {
        self.transition(id, "admin_update", move |order| {
            order.apply_admin_update(update)
        })
        .await
    }

    pub async fn confirm_order_received(&self, id: Uuid) -> Result<Order, AppError> {
        self.transition(id, "confirm_received", Order::confirm_received)
            .await
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<Order, AppError> {
        self.transition(id, "cancel", Order::cancel).await
    }

    /// True once any order of `user_id` containing `product_id` is DeliveredConfirmed.
    pub async fn check_review_eligibility(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .repo
            .exists_with_product(user_id, product_id, OrderStatus::DeliveredConfirmed)
            .await?)
    }

    /// Load, apply `step` to a copy, and write it back only if nobody else
    /// wrote in between. A rejected step never reaches the store.
    async fn transition<F>(
        &self,
        id: Uuid,
        action: &'static str,
        step: F,
    ) -> Result<Order, AppError>
    where
        F: FnOnce(&mut Order) -> Result<(), TransitionError> + Send,
    {
        let mut order = self.get_order(id).await?;
        let expected_version = order.version;
        let from = order.status;

        if let Err(e) = step(&mut order) {
            tracing::info!(
                order_id = %id,
                action,
                status = %from,
                error = %e,
                "transition rejected"
            );
            return Err(e.into());
        }

        let saved = self
            .repo
            .save(order, expected_version)
            .await
            .inspect_err(|e| {
                tracing::warn!(order_id = %id, action, error = %e, "transition not persisted");
            })?;
        tracing::info!(
            order_id = %id,
            action,
            from = %from,
            to = %saved.status,
            delivery = %saved.delivery_option,
            "transition applied"
        );
        Ok(saved)
    }
}

#[async_trait]
impl<R: OrderRepository> ReviewEligibility for OrderService<R> {
    type Error = AppError;

    async fn is_eligible_for_review(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError> {
        self.check_review_eligibility(user_id, product_id).await
    }
}
