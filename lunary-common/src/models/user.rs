use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of an account the referral core reads (and the one column the
/// reward granter extends). Account provisioning lives elsewhere.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            trial_ends_at: None,
        }
    }

    pub fn with_created_at(created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            created_at,
            trial_ends_at: None,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}
