use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger row recording one benefit extension. The primary key
/// (referral_id, user_id) is the idempotency key: re-granting the same
/// pair inserts nothing and extends nothing.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct RewardGrant {
    pub referral_id: Uuid,
    pub user_id: Uuid,
    pub days: i32,
    pub granted_at: DateTime<Utc>,
}
