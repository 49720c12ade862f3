use async_trait::async_trait;
use uuid::Uuid;

/// What the review flow may ask of order history: has this user received a
/// confirmed delivery of this product? Implemented by the lifecycle service so
/// reviews never read order state directly.
#[async_trait]
pub trait ReviewEligibility: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn is_eligible_for_review(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, Self::Error>;
}
