use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use lunary_common::error::Error;
use lunary_common::models::referral::Referral;
use lunary_common::traits::repository_traits::ReferralRepository;

use super::{ActivationGuard, GuardDecision};

/// Denies the reward once a referrer has accumulated `cap` activations
/// inside the trailing window, bounding the worst-case payout per referrer
/// regardless of whether the referrals are legitimate.
pub struct VelocityGuard {
    referrals: Arc<dyn ReferralRepository>,
    cap: i64,
    window: Option<Duration>,
}

impl VelocityGuard {
    pub fn new(referrals: Arc<dyn ReferralRepository>, cap: i64, window: Option<Duration>) -> Self {
        Self {
            referrals,
            cap,
            window,
        }
    }
}

#[async_trait]
impl ActivationGuard for VelocityGuard {
    fn name(&self) -> &'static str {
        "velocity"
    }

    async fn check(
        &self,
        referral: &Referral,
        now: DateTime<Utc>,
    ) -> Result<GuardDecision, Error> {
        let since = self.window.map(|w| now - w);
        let credited = self
            .referrals
            .count_activated_for_referrer(referral.referrer_user_id, since)
            .await?;

        if credited >= self.cap {
            Ok(GuardDecision::Deny {
                reason: format!(
                    "referrer already credited with {} activations (cap {})",
                    credited, self.cap
                ),
            })
        } else {
            Ok(GuardDecision::Pass)
        }
    }
}
