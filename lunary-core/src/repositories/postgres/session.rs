use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use lunary_common::error::Error;
use lunary_common::models::session::Session;
pub(crate) use lunary_common::traits::repository_traits::SessionRepository;

#[derive(Clone)]
pub struct PostgresSessionRepository {
    pool: Pool<Postgres>,
}

impl PostgresSessionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create(&self, session: &Session) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, ip_address, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
            .bind(session.session_id)
            .bind(session.user_id)
            .bind(&session.ip_address)
            .bind(session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_ip_for_user(&self, user_id: Uuid) -> Result<Option<String>, Error> {
        let ip: Option<String> = sqlx::query_scalar(
            r#"
            SELECT ip_address
            FROM sessions
            WHERE user_id = $1
              AND ip_address IS NOT NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ip)
    }
}
