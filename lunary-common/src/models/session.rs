use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session captured by the front door at signup/login. The IP address is
/// best-effort; capture can fail and the column stays NULL.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, ip_address: Option<&str>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            ip_address: ip_address.map(String::from),
            created_at: Utc::now(),
        }
    }
}
