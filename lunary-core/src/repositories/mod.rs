// src/repositories/mod.rs

pub mod postgres;

pub use postgres::referral::PostgresReferralRepository;
pub use postgres::reward::PostgresRewardGranter;
pub use postgres::session::PostgresSessionRepository;
pub use postgres::user::PostgresUserRepository;
