use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use lunary_common::error::Error;
use lunary_common::models::referral::Referral;

pub mod account_age;
pub mod ip_collusion;
pub mod velocity;

pub use account_age::AccountAgeGuard;
pub use ip_collusion::IpCollusionGuard;
pub use velocity::VelocityGuard;

/// Result of applying one guard to a pending referral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Continue down the chain.
    Pass,
    /// Not eligible yet; leave the referral pending so a later qualifying
    /// event re-evaluates it.
    Hold { reason: String },
    /// Abuse suspected; record the activation but withhold the reward.
    Deny { reason: String },
}

/// One pass/reject check in the activation pipeline.
#[async_trait]
pub trait ActivationGuard: Send + Sync {
    /// Short identifier used in logs and outcomes.
    fn name(&self) -> &'static str;

    async fn check(
        &self,
        referral: &Referral,
        now: DateTime<Utc>,
    ) -> Result<GuardDecision, Error>;
}

/// What the full chain decided, tagged with the guard that stopped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    Pass,
    Hold { guard: &'static str, reason: String },
    Deny { guard: &'static str, reason: String },
}

/// Guards in fixed order; the first non-pass decision preempts everything
/// after it, so a held referral never costs the later guards' queries.
pub struct GuardChain {
    guards: Vec<Arc<dyn ActivationGuard>>,
}

impl GuardChain {
    pub fn new(guards: Vec<Arc<dyn ActivationGuard>>) -> Self {
        Self { guards }
    }

    pub async fn evaluate(
        &self,
        referral: &Referral,
        now: DateTime<Utc>,
    ) -> Result<ChainVerdict, Error> {
        for guard in &self.guards {
            match guard.check(referral, now).await? {
                GuardDecision::Pass => {
                    debug!("guard '{}' passed referral {}", guard.name(), referral.referral_id);
                }
                GuardDecision::Hold { reason } => {
                    return Ok(ChainVerdict::Hold {
                        guard: guard.name(),
                        reason,
                    });
                }
                GuardDecision::Deny { reason } => {
                    return Ok(ChainVerdict::Deny {
                        guard: guard.name(),
                        reason,
                    });
                }
            }
        }
        Ok(ChainVerdict::Pass)
    }
}
