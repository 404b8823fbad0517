pub mod guards;
pub mod referral_service;

pub use referral_service::{ActivationConfig, ReferralService};
