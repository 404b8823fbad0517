use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::error::Error;
use crate::models::referral::{ActivationState, Referral, ReferralStats};
use crate::models::session::Session;
use crate::models::user::User;

/// Exclusive hold on a referral row that was still `pending` when the
/// claim was taken. Exactly one concurrent caller can hold a claim for a
/// given referral; everyone else sees `None` from `claim_pending`.
///
/// Dropping a claim without calling `finalize` releases the hold and
/// leaves the row pending, so a failed reward grant can be retried.
#[async_trait]
pub trait ActivationClaim: Send {
    /// Write the terminal state and release the hold.
    async fn finalize(self: Box<Self>, to: ActivationState) -> Result<(), Error>;
}

#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Insert a new `pending` referral row.
    async fn create(&self, referral: &Referral) -> Result<(), Error>;

    /// The one read every activity event pays: the referred user's
    /// unactivated referral, if any.
    async fn find_pending_by_referred(
        &self,
        referred_user_id: Uuid,
    ) -> Result<Option<Referral>, Error>;

    /// Activations already credited to a referrer, in any terminal state.
    /// `since` bounds the trailing window; `None` counts all time.
    async fn count_activated_for_referrer(
        &self,
        referrer_user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, Error>;

    /// Prior activations (by anyone) whose referred account has a session
    /// recorded from exactly this IP address.
    async fn count_activated_with_ip(
        &self,
        ip: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, Error>;

    /// Single conditional transition `pending -> to`. Returns whether this
    /// caller won; a losing caller must treat `false` as "already handled".
    async fn try_finalize(
        &self,
        referral_id: Uuid,
        to: ActivationState,
    ) -> Result<bool, Error>;

    /// Lock the row and confirm it is still `pending`. `None` means the
    /// referral is gone, already terminal, or claimed by a racer.
    async fn claim_pending(
        &self,
        referral_id: Uuid,
    ) -> Result<Option<Box<dyn ActivationClaim>>, Error>;

    async fn stats_for_referrer(
        &self,
        referrer_user_id: Uuid,
    ) -> Result<ReferralStats, Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), Error>;

    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error>;

    async fn get_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, Error>;

    /// Push the trial end out by `days`, counted from now or from the
    /// current trial end, whichever is later.
    async fn extend_trial(&self, user_id: Uuid, days: i32) -> Result<(), Error>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), Error>;

    /// Most recent session with an IP on record for this user. `None`
    /// when capture failed or the user has no sessions.
    async fn latest_ip_for_user(&self, user_id: Uuid) -> Result<Option<String>, Error>;
}
