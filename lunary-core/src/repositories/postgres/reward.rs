use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use tracing::debug;
use uuid::Uuid;

use lunary_common::error::Error;
pub(crate) use lunary_common::traits::reward_traits::RewardGranter;

/// Trial days credited to each side of an activated referral.
pub const DEFAULT_REWARD_DAYS: i32 = 30;

/// Grants a referral reward by extending the account's trial. The insert
/// into `reward_grants` is the idempotency key: on conflict the whole
/// grant is a no-op, so retries and racing callers cannot compound the
/// extension.
#[derive(Clone)]
pub struct PostgresRewardGranter {
    pool: Pool<Postgres>,
    reward_days: i32,
}

impl PostgresRewardGranter {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            reward_days: DEFAULT_REWARD_DAYS,
        }
    }

    pub fn with_reward_days(pool: Pool<Postgres>, reward_days: i32) -> Self {
        Self { pool, reward_days }
    }

    async fn apply_grant(&self, user_id: Uuid, referral_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO reward_grants (referral_id, user_id, days, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (referral_id, user_id) DO NOTHING
            "#,
        )
            .bind(referral_id)
            .bind(user_id)
            .bind(self.reward_days)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 1 {
            sqlx::query(
                r#"
                UPDATE users
                SET trial_ends_at = GREATEST(trial_ends_at, $1) + ($2 * INTERVAL '1 day')
                WHERE user_id = $3
                "#,
            )
                .bind(Utc::now())
                .bind(self.reward_days)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        } else {
            debug!("reward for referral {} already granted to user {}", referral_id, user_id);
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RewardGranter for PostgresRewardGranter {
    async fn grant(&self, user_id: Uuid, referral_id: Uuid) -> Result<(), Error> {
        self.apply_grant(user_id, referral_id)
            .await
            .map_err(|e| Error::Grant(format!(
                "grant for user {} on referral {} failed: {}",
                user_id, referral_id, e
            )))
    }
}
