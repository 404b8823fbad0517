use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use lunary_common::error::Error;
use lunary_common::models::referral::Referral;
use lunary_common::traits::repository_traits::UserRepository;

use super::{ActivationGuard, GuardDecision};

/// Holds activity from accounts younger than the minimum age. Blocks
/// disposable-account farming where throwaway accounts are created and
/// "activated" in one sitting.
pub struct AccountAgeGuard {
    users: Arc<dyn UserRepository>,
    min_account_age: Duration,
}

impl AccountAgeGuard {
    pub fn new(users: Arc<dyn UserRepository>, min_account_age: Duration) -> Self {
        Self {
            users,
            min_account_age,
        }
    }
}

#[async_trait]
impl ActivationGuard for AccountAgeGuard {
    fn name(&self) -> &'static str {
        "account_age"
    }

    async fn check(
        &self,
        referral: &Referral,
        now: DateTime<Utc>,
    ) -> Result<GuardDecision, Error> {
        let created_at = match self.users.get_created_at(referral.referred_user_id).await? {
            Some(ts) => ts,
            // Provisioning can lag the first activity event; hold rather
            // than fail so the next event re-evaluates.
            None => {
                return Ok(GuardDecision::Hold {
                    reason: "referred account not found".to_string(),
                });
            }
        };

        let age = now - created_at;
        if age < self.min_account_age {
            Ok(GuardDecision::Hold {
                reason: format!(
                    "account is {}m old, minimum is {}m",
                    age.num_minutes(),
                    self.min_account_age.num_minutes()
                ),
            })
        } else {
            Ok(GuardDecision::Pass)
        }
    }
}
