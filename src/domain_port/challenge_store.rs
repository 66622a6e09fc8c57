use crate::domain_model::{EmailAddress, InvalidateReason, OtpChallenge};
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Persist a freshly issued challenge. Any pending challenge for the
    /// same address transitions to `Superseded` in the same step.
    async fn put_pending(&self, challenge: OtpChallenge) -> Result<(), ChallengeStoreError>;

    async fn lookup_pending(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<OtpChallenge>, ChallengeStoreError>;

    /// The whole lookup-compare-mutate path for one address. Atomic with
    /// respect to concurrent calls for that address.
    async fn verify_and_consume(
        &self,
        email: &EmailAddress,
        provided_mac_hex: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ChallengeStoreError>;

    /// Force a pending challenge out of `Pending`. No-op when nothing is
    /// pending for the address.
    async fn invalidate(
        &self,
        email: &EmailAddress,
        reason: InvalidateReason,
    ) -> Result<(), ChallengeStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChallengeStoreError {
    #[error("incorrect code, {remaining_attempts} attempt(s) left")]
    Mismatch { remaining_attempts: u32 },
    #[error("no pending challenge")]
    NotFound,
    #[error("challenge expired")]
    Expired,
    #[error("attempt budget exhausted")]
    AttemptsExhausted,
    #[error("infra error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
