use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use lunary_common::error::Error;
use lunary_common::models::referral::Referral;
use lunary_common::traits::repository_traits::{ReferralRepository, SessionRepository};

use super::{ActivationGuard, GuardDecision};

/// Denies the reward when the referred account's session IP already
/// appears on a prior activation: one operator farming many accounts from
/// a single network origin. A missing IP is not collusion; session capture
/// fails for legitimate users too, so the guard steps aside.
pub struct IpCollusionGuard {
    referrals: Arc<dyn ReferralRepository>,
    sessions: Arc<dyn SessionRepository>,
    window: Option<Duration>,
}

impl IpCollusionGuard {
    pub fn new(
        referrals: Arc<dyn ReferralRepository>,
        sessions: Arc<dyn SessionRepository>,
        window: Option<Duration>,
    ) -> Self {
        Self {
            referrals,
            sessions,
            window,
        }
    }
}

#[async_trait]
impl ActivationGuard for IpCollusionGuard {
    fn name(&self) -> &'static str {
        "ip_collusion"
    }

    async fn check(
        &self,
        referral: &Referral,
        now: DateTime<Utc>,
    ) -> Result<GuardDecision, Error> {
        let ip = match self
            .sessions
            .latest_ip_for_user(referral.referred_user_id)
            .await?
        {
            Some(ip) => ip,
            None => {
                debug!(
                    "no session IP on record for user {}; skipping collusion check",
                    referral.referred_user_id
                );
                return Ok(GuardDecision::Pass);
            }
        };

        let since = self.window.map(|w| now - w);
        let prior = self.referrals.count_activated_with_ip(&ip, since).await?;

        if prior > 0 {
            Ok(GuardDecision::Deny {
                reason: format!("{} prior activation(s) from IP {}", prior, ip),
            })
        } else {
            Ok(GuardDecision::Pass)
        }
    }
}
