use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use lunary_common::error::Error;
use lunary_common::models::referral::{ActivationState, Referral, ReferralStats};
pub(crate) use lunary_common::traits::repository_traits::{ActivationClaim, ReferralRepository};

#[derive(Clone)]
pub struct PostgresReferralRepository {
    pool: Pool<Postgres>,
}

impl PostgresReferralRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn referral_from_row(r: &sqlx::postgres::PgRow) -> Result<Referral, Error> {
    Ok(Referral {
        referral_id: r.try_get("referral_id")?,
        referrer_user_id: r.try_get("referrer_user_id")?,
        referred_user_id: r.try_get("referred_user_id")?,
        activation_state: r.try_get("activation_state")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl ReferralRepository for PostgresReferralRepository {
    async fn create(&self, referral: &Referral) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO referrals (
                referral_id,
                referrer_user_id,
                referred_user_id,
                activation_state,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
            .bind(referral.referral_id)
            .bind(referral.referrer_user_id)
            .bind(referral.referred_user_id)
            .bind(referral.activation_state)
            .bind(referral.created_at)
            .bind(referral.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_pending_by_referred(
        &self,
        referred_user_id: Uuid,
    ) -> Result<Option<Referral>, Error> {
        let row = sqlx::query(
            r#"
            SELECT
                referral_id,
                referrer_user_id,
                referred_user_id,
                activation_state,
                created_at,
                updated_at
            FROM referrals
            WHERE referred_user_id = $1
              AND activation_state = 'pending'
            ORDER BY created_at
            LIMIT 1
            "#,
        )
            .bind(referred_user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(referral_from_row(&r)?)),
            None => Ok(None),
        }
    }

    async fn count_activated_for_referrer(
        &self,
        referrer_user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM referrals
            WHERE referrer_user_id = $1
              AND activation_state IN ('activated_no_reward', 'activated_with_reward')
              AND ($2::timestamptz IS NULL OR updated_at >= $2)
            "#,
        )
            .bind(referrer_user_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_activated_with_ip(
        &self,
        ip: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, Error> {
        // One referred account can have several sessions from the same
        // address; count referrals, not session rows.
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT r.referral_id)
            FROM referrals r
            JOIN sessions s ON s.user_id = r.referred_user_id
            WHERE s.ip_address = $1
              AND r.activation_state IN ('activated_no_reward', 'activated_with_reward')
              AND ($2::timestamptz IS NULL OR r.updated_at >= $2)
            "#,
        )
            .bind(ip)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn try_finalize(
        &self,
        referral_id: Uuid,
        to: ActivationState,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE referrals
            SET activation_state = $1,
                updated_at       = $2
            WHERE referral_id = $3
              AND activation_state = 'pending'
            "#,
        )
            .bind(to)
            .bind(Utc::now())
            .bind(referral_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn claim_pending(
        &self,
        referral_id: Uuid,
    ) -> Result<Option<Box<dyn ActivationClaim>>, Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT activation_state FROM referrals WHERE referral_id = $1 FOR UPDATE",
        )
            .bind(referral_id)
            .fetch_optional(&mut *tx)
            .await?;

        let state: Option<ActivationState> = match row {
            Some(r) => Some(r.try_get("activation_state")?),
            None => None,
        };

        match state {
            Some(ActivationState::Pending) => Ok(Some(Box::new(PgActivationClaim {
                tx,
                referral_id,
            }))),
            _ => {
                // Gone or already terminal; a racer got here first.
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    async fn stats_for_referrer(
        &self,
        referrer_user_id: Uuid,
    ) -> Result<ReferralStats, Error> {
        let rows = sqlx::query(
            r#"
            SELECT activation_state, COUNT(*) AS cnt
            FROM referrals
            WHERE referrer_user_id = $1
            GROUP BY activation_state
            "#,
        )
            .bind(referrer_user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut stats = ReferralStats::default();
        for r in rows {
            let state: ActivationState = r.try_get("activation_state")?;
            let cnt: i64 = r.try_get("cnt")?;
            stats.total += cnt;
            match state {
                ActivationState::Pending => stats.pending += cnt,
                ActivationState::ActivatedNoReward => stats.activated_no_reward += cnt,
                ActivationState::ActivatedWithReward => stats.activated_with_reward += cnt,
            }
        }
        Ok(stats)
    }
}

/// Row lock on a still-pending referral. The open transaction is the hold;
/// dropping the claim without finalizing rolls it back and the row stays
/// pending.
struct PgActivationClaim {
    tx: Transaction<'static, Postgres>,
    referral_id: Uuid,
}

#[async_trait]
impl ActivationClaim for PgActivationClaim {
    async fn finalize(mut self: Box<Self>, to: ActivationState) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE referrals
            SET activation_state = $1,
                updated_at       = $2
            WHERE referral_id = $3
            "#,
        )
            .bind(to)
            .bind(Utc::now())
            .bind(self.referral_id)
            .execute(&mut *self.tx)
            .await?;
        self.tx.commit().await?;
        Ok(())
    }
}
