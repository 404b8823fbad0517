use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use lunary_common::error::Error;
use lunary_common::models::referral::{
    ActivationOutcome, ActivationState, Referral, ReferralStats,
};
use lunary_common::traits::repository_traits::{
    ReferralRepository, SessionRepository, UserRepository,
};
use lunary_common::traits::reward_traits::RewardGranter;

use crate::services::guards::{
    AccountAgeGuard, ChainVerdict, GuardChain, IpCollusionGuard, VelocityGuard,
};

/// Tunable thresholds for the activation pipeline. These are compile-time
/// constants of a deployment, not dynamic configuration.
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// Referred accounts younger than this are held for a later event.
    pub min_account_age: Duration,
    /// Activations credited to one referrer before further ones are
    /// accepted but unrewarded.
    pub velocity_cap: i64,
    /// Trailing window for the velocity count; `None` counts all time.
    pub velocity_window: Option<Duration>,
    /// Trailing window for the IP-collusion count; `None` counts all time.
    pub ip_window: Option<Duration>,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            min_account_age: Duration::hours(1),
            velocity_cap: 3,
            velocity_window: None,
            ip_window: None,
        }
    }
}

/// Decides whether a referred user's activity activates their referral,
/// and whether that activation pays out. All coordination state lives in
/// the store; the service itself is stateless and safe to call from any
/// number of concurrent request handlers.
pub struct ReferralService {
    referrals: Arc<dyn ReferralRepository>,
    granter: Arc<dyn RewardGranter>,
    chain: GuardChain,
}

impl ReferralService {
    pub fn new(
        referrals: Arc<dyn ReferralRepository>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        granter: Arc<dyn RewardGranter>,
        config: ActivationConfig,
    ) -> Self {
        let chain = GuardChain::new(vec![
            Arc::new(AccountAgeGuard::new(users, config.min_account_age)),
            Arc::new(VelocityGuard::new(
                referrals.clone(),
                config.velocity_cap,
                config.velocity_window,
            )),
            Arc::new(IpCollusionGuard::new(
                referrals.clone(),
                sessions,
                config.ip_window,
            )),
        ]);
        Self {
            referrals,
            granter,
            chain,
        }
    }

    /// Evaluates one qualifying activity event for a referred user:
    ///  1. Finds the user's pending referral (the only read most events pay).
    ///  2. Drops self-referrals without further queries.
    ///  3. Runs the guard chain, short-circuiting on the first rejection.
    ///  4. On a deny, records the activation without a reward.
    ///  5. When every guard passes, claims the row, grants both sides,
    ///     then finalizes.
    ///
    /// `event_type` is advisory; it shows up in logs and nowhere else.
    pub async fn check_invite_activation(
        &self,
        user_id: Uuid,
        event_type: &str,
    ) -> Result<ActivationOutcome, Error> {
        let referral = match self.referrals.find_pending_by_referred(user_id).await? {
            Some(r) => r,
            None => {
                debug!(
                    "no unactivated referral for user {} (event '{}')",
                    user_id, event_type
                );
                return Ok(ActivationOutcome::NoPendingReferral);
            }
        };

        // Referral links are never issued to their own account, but the
        // row contents cross a trust boundary.
        if referral.is_self_referral() {
            debug!("referral {} is a self-referral; ignoring", referral.referral_id);
            return Ok(ActivationOutcome::SelfReferral);
        }

        let now = Utc::now();
        match self.chain.evaluate(&referral, now).await? {
            ChainVerdict::Hold { guard, reason } => {
                debug!(
                    "referral {} held by '{}': {} (event '{}')",
                    referral.referral_id, guard, reason, event_type
                );
                Ok(ActivationOutcome::Held { guard, reason })
            }
            ChainVerdict::Deny { guard, reason } => {
                let won = self
                    .referrals
                    .try_finalize(referral.referral_id, ActivationState::ActivatedNoReward)
                    .await?;
                if !won {
                    debug!("referral {} already finalized by a racer", referral.referral_id);
                    return Ok(ActivationOutcome::AlreadyFinalized);
                }
                info!(
                    "referral {} activated without reward, denied by '{}': {}",
                    referral.referral_id, guard, reason
                );
                Ok(ActivationOutcome::Withheld { guard, reason })
            }
            ChainVerdict::Pass => self.reward_and_finalize(&referral, event_type).await,
        }
    }

    /// Claims the pending row before any grant is issued, so a lost race
    /// cannot produce two grants; commits the terminal state only after
    /// both grants succeed, so a grant failure leaves the row pending and
    /// the next event retries. The granter's (referral, account)
    /// idempotency key backstops both orderings.
    async fn reward_and_finalize(
        &self,
        referral: &Referral,
        event_type: &str,
    ) -> Result<ActivationOutcome, Error> {
        let claim = match self.referrals.claim_pending(referral.referral_id).await? {
            Some(claim) => claim,
            None => {
                debug!("referral {} lost the activation race", referral.referral_id);
                return Ok(ActivationOutcome::AlreadyFinalized);
            }
        };

        self.granter
            .grant(referral.referrer_user_id, referral.referral_id)
            .await?;
        self.granter
            .grant(referral.referred_user_id, referral.referral_id)
            .await?;

        claim.finalize(ActivationState::ActivatedWithReward).await?;

        info!(
            "referral {} activated with reward for referrer {} and referred {} (event '{}')",
            referral.referral_id,
            referral.referrer_user_id,
            referral.referred_user_id,
            event_type
        );
        Ok(ActivationOutcome::Rewarded)
    }

    /// Records a new invite relationship at signup time.
    pub async fn create_referral(
        &self,
        referrer_user_id: Uuid,
        referred_user_id: Uuid,
    ) -> Result<Referral, Error> {
        if referrer_user_id == referred_user_id {
            return Err(Error::SelfReferral(referrer_user_id));
        }
        let referral = Referral::new(referrer_user_id, referred_user_id);
        self.referrals.create(&referral).await?;
        info!(
            "created referral {} ({} invited {})",
            referral.referral_id, referrer_user_id, referred_user_id
        );
        Ok(referral)
    }

    /// Counts shown on the referrer's dashboard.
    pub async fn stats_for_referrer(
        &self,
        referrer_user_id: Uuid,
    ) -> Result<ReferralStats, Error> {
        self.referrals.stats_for_referrer(referrer_user_id).await
    }
}
