// File: lunary-common/src/models/referral.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Add sqlx::Type so that SQLx knows how to decode this enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivationState {
    Pending,
    ActivatedNoReward,
    ActivatedWithReward,
}

impl ActivationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationState::Pending => "pending",
            ActivationState::ActivatedNoReward => "activated_no_reward",
            ActivationState::ActivatedWithReward => "activated_with_reward",
        }
    }

    /// Terminal states are written exactly once and never re-evaluated.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActivationState::Pending)
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivationState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActivationState::Pending),
            "activated_no_reward" => Ok(ActivationState::ActivatedNoReward),
            "activated_with_reward" => Ok(ActivationState::ActivatedWithReward),
            _ => Err(format!("Unknown activation state: {}", s)),
        }
    }
}

/// A referral links the account that issued an invite to the account that
/// signed up through it. The row is created at signup and reaches one of
/// the two activated states at most once.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Referral {
    pub referral_id: Uuid,
    pub referrer_user_id: Uuid,
    pub referred_user_id: Uuid,
    pub activation_state: ActivationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn new(referrer_user_id: Uuid, referred_user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            referral_id: Uuid::new_v4(),
            referrer_user_id,
            referred_user_id,
            activation_state: ActivationState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_self_referral(&self) -> bool {
        self.referrer_user_id == self.referred_user_id
    }
}

/// What a single pipeline evaluation decided for one activity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No unactivated referral exists for this user.
    NoPendingReferral,
    /// Referrer and referred are the same account; nothing to evaluate.
    SelfReferral,
    /// Not yet eligible; the referral stays pending and a later event
    /// re-evaluates it.
    Held { guard: &'static str, reason: String },
    /// Abuse suspected; the activation was recorded but no reward issued.
    Withheld { guard: &'static str, reason: String },
    /// Both accounts were granted the reward and the referral finalized.
    Rewarded,
    /// Another caller finalized the referral first.
    AlreadyFinalized,
}

/// Per-referrer counts surfaced on the referrer's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStats {
    pub total: i64,
    pub pending: i64,
    pub activated_no_reward: i64,
    pub activated_with_reward: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_state_round_trips_through_strings() {
        for state in [
            ActivationState::Pending,
            ActivationState::ActivatedNoReward,
            ActivationState::ActivatedWithReward,
        ] {
            assert_eq!(state.as_str().parse::<ActivationState>(), Ok(state));
        }
        assert!("granted".parse::<ActivationState>().is_err());
    }

    #[test]
    fn new_referral_starts_pending() {
        let referral = Referral::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(referral.activation_state, ActivationState::Pending);
        assert!(!referral.activation_state.is_terminal());
        assert!(!referral.is_self_referral());
    }

    #[test]
    fn self_referral_is_detected() {
        let user = Uuid::new_v4();
        assert!(Referral::new(user, user).is_self_referral());
    }

    #[test]
    fn stats_serialize_for_the_dashboard() {
        let stats = ReferralStats {
            total: 4,
            pending: 1,
            activated_no_reward: 1,
            activated_with_reward: 2,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total"], 4);
        assert_eq!(json["activated_with_reward"], 2);
    }
}
