// File: lunary-common/src/models/mod.rs
pub mod referral;
pub mod reward;
pub mod session;
pub mod user;

pub use referral::{ActivationOutcome, ActivationState, Referral, ReferralStats};
pub use reward::RewardGrant;
pub use session::Session;
pub use user::User;
