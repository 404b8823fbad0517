use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Error;

/// Capability injected into the activation pipeline to extend a benefit to
/// one account. Implementations must be idempotent per
/// (referral_id, user_id): the operation is safe to invoke at-least-once,
/// including concurrently.
#[async_trait]
pub trait RewardGranter: Send + Sync {
    async fn grant(&self, user_id: Uuid, referral_id: Uuid) -> Result<(), Error>;
}
