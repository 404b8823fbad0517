use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use lunary_common::error::Error;
use lunary_common::models::user::User;
pub(crate) use lunary_common::traits::repository_traits::UserRepository;

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, created_at, trial_ends_at)
            VALUES ($1, $2, $3)
            "#,
        )
            .bind(user.user_id)
            .bind(user.created_at)
            .bind(user.trial_ends_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, created_at, trial_ends_at FROM users WHERE user_id = $1",
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, Error> {
        let created_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT created_at FROM users WHERE user_id = $1",
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(created_at)
    }

    async fn extend_trial(&self, user_id: Uuid, days: i32) -> Result<(), Error> {
        // GREATEST ignores the NULL when no trial is running, so the
        // extension is counted from now in that case.
        sqlx::query(
            r#"
            UPDATE users
            SET trial_ends_at = GREATEST(trial_ends_at, $1) + ($2 * INTERVAL '1 day')
            WHERE user_id = $3
            "#,
        )
            .bind(Utc::now())
            .bind(days)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
