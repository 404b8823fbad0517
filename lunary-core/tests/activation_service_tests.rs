// File: lunary-core/tests/activation_service_tests.rs
//
// End-to-end pipeline runs against the real test database, wiring the
// Postgres repositories and granter into the service the way the API
// layer does.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Duration, Utc};
use uuid::Uuid;

use lunary_common::models::referral::{ActivationOutcome, ActivationState, Referral};
use lunary_common::models::session::Session;
use lunary_common::models::user::User;
use lunary_common::traits::repository_traits::{
    ReferralRepository, SessionRepository, UserRepository,
};
use lunary_core::Error;
use lunary_core::db::Database;
use lunary_core::repositories::{
    PostgresReferralRepository, PostgresRewardGranter, PostgresSessionRepository,
    PostgresUserRepository,
};
use lunary_core::services::{ActivationConfig, ReferralService};
use lunary_core::test_utils::helpers::*;

struct TestEnv {
    users: PostgresUserRepository,
    sessions: PostgresSessionRepository,
    referrals: PostgresReferralRepository,
    service: ReferralService,
}

fn build_env(db: &Database) -> TestEnv {
    let users = PostgresUserRepository::new(db.pool().clone());
    let sessions = PostgresSessionRepository::new(db.pool().clone());
    let referrals = PostgresReferralRepository::new(db.pool().clone());
    let service = ReferralService::new(
        Arc::new(referrals.clone()),
        Arc::new(users.clone()),
        Arc::new(sessions.clone()),
        Arc::new(PostgresRewardGranter::new(db.pool().clone())),
        ActivationConfig::default(),
    );
    TestEnv {
        users,
        sessions,
        referrals,
        service,
    }
}

async fn seed_referred_user(
    env: &TestEnv,
    age: Duration,
    ip: Option<&str>,
) -> Result<Uuid, Error> {
    let user = User::with_created_at(Utc::now() - age);
    let user_id = user.user_id;
    env.users.create(&user).await?;
    env.sessions.create(&Session::new(user_id, ip)).await?;
    Ok(user_id)
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_clean_activation_grants_and_finalizes() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let env = build_env(&db);

    let referrer = User::with_created_at(Utc::now() - Duration::days(30));
    env.users.create(&referrer).await?;
    let referred = seed_referred_user(&env, Duration::hours(5), Some("9.8.7.6")).await?;

    let referral = env.service.create_referral(referrer.user_id, referred).await?;

    let outcome = env
        .service
        .check_invite_activation(referred, "journal_entry_created")
        .await?;
    assert_eq!(outcome, ActivationOutcome::Rewarded);

    // Both sides got the trial extension.
    for account in [referrer.user_id, referred] {
        let user = env
            .users
            .get(account)
            .await?
            .ok_or_else(|| anyhow!("user {account} disappeared"))?;
        assert!(user.trial_ends_at.is_some(), "no trial for {account}");
    }

    // Re-invocation converges without further effect.
    let again = env
        .service
        .check_invite_activation(referred, "journal_entry_created")
        .await?;
    assert_eq!(again, ActivationOutcome::NoPendingReferral);

    let stats = env.service.stats_for_referrer(referrer.user_id).await?;
    assert_eq!(stats.activated_with_reward, 1);

    // The row is terminal exactly once.
    assert!(env.referrals.claim_pending(referral.referral_id).await?.is_none());

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_velocity_cap_and_ip_collusion_withhold_rewards() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let env = build_env(&db);

    let referrer = User::with_created_at(Utc::now() - Duration::days(90));
    env.users.create(&referrer).await?;

    // Three activations put the referrer at the cap...
    for _ in 0..3 {
        let referred = seed_referred_user(&env, Duration::hours(5), None).await?;
        env.service.create_referral(referrer.user_id, referred).await?;
        let outcome = env
            .service
            .check_invite_activation(referred, "daily_ritual_completed")
            .await?;
        assert_eq!(outcome, ActivationOutcome::Rewarded);
    }

    // ...so the fourth is recorded without a reward.
    let fourth = seed_referred_user(&env, Duration::hours(5), None).await?;
    env.service.create_referral(referrer.user_id, fourth).await?;
    let outcome = env
        .service
        .check_invite_activation(fourth, "daily_ritual_completed")
        .await?;
    assert!(matches!(outcome, ActivationOutcome::Withheld { guard: "velocity", .. }));

    let stats = env.service.stats_for_referrer(referrer.user_id).await?;
    assert_eq!(stats.activated_with_reward, 3);
    assert_eq!(stats.activated_no_reward, 1);

    // A different referrer activating from an already-used address is
    // caught by the IP guard instead.
    let other_referrer = User::with_created_at(Utc::now() - Duration::days(30));
    env.users.create(&other_referrer).await?;
    let colluding = seed_referred_user(&env, Duration::hours(5), Some("1.2.3.4")).await?;
    let prior = seed_referred_user(&env, Duration::days(2), Some("1.2.3.4")).await?;
    let prior_referral = Referral::new(other_referrer.user_id, prior);
    env.referrals.create(&prior_referral).await?;
    assert!(
        env.referrals
            .try_finalize(prior_referral.referral_id, ActivationState::ActivatedWithReward)
            .await?
    );

    env.service
        .create_referral(other_referrer.user_id, colluding)
        .await?;
    let outcome = env
        .service
        .check_invite_activation(colluding, "tarot_spread_completed")
        .await?;
    assert!(matches!(outcome, ActivationOutcome::Withheld { guard: "ip_collusion", .. }));

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_young_account_stays_pending_until_mature() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let env = build_env(&db);

    let referrer = User::with_created_at(Utc::now() - Duration::days(30));
    env.users.create(&referrer).await?;
    let referred = seed_referred_user(&env, Duration::minutes(5), Some("9.8.7.6")).await?;
    env.service.create_referral(referrer.user_id, referred).await?;

    let outcome = env
        .service
        .check_invite_activation(referred, "journal_entry_created")
        .await?;
    assert!(matches!(outcome, ActivationOutcome::Held { guard: "account_age", .. }));

    // Still pending: the next qualifying event gets another chance.
    assert!(env.referrals.find_pending_by_referred(referred).await?.is_some());

    Ok(())
}
