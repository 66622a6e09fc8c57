use crate::domain_port::{ChallengeStoreError, TransportError};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the caller of `request_code` learns. The code itself travels only
/// through the mail transport.
#[derive(Debug, Clone, Serialize)]
pub struct IssueReceipt {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssueInput {
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct VerifyInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("code must be exactly six digits")]
    InvalidCode,
    #[error("no pending code for this address")]
    NotFound,
    #[error("code expired")]
    Expired,
    #[error("attempt budget exhausted")]
    AttemptsExhausted,
    #[error("incorrect code, {remaining_attempts} attempt(s) left")]
    Mismatch { remaining_attempts: u32 },
    #[error("could not send code: {0}")]
    Delivery(#[from] TransportError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ChallengeStoreError> for VerificationError {
    fn from(err: ChallengeStoreError) -> Self {
        match err {
            ChallengeStoreError::Mismatch { remaining_attempts } => {
                VerificationError::Mismatch { remaining_attempts }
            }
            ChallengeStoreError::NotFound => VerificationError::NotFound,
            ChallengeStoreError::Expired => VerificationError::Expired,
            ChallengeStoreError::AttemptsExhausted => VerificationError::AttemptsExhausted,
            ChallengeStoreError::Store(e) => VerificationError::Store(e),
            ChallengeStoreError::InternalError(e) => VerificationError::InternalError(e),
        }
    }
}

#[async_trait::async_trait]
pub trait VerificationService: Send + Sync {
    /// Issue a fresh code for the address and hand it to the mail
    /// transport. Supersedes any pending code for the same address.
    async fn request_code(&self, input: IssueInput) -> Result<IssueReceipt, VerificationError>;

    /// Check a submitted code against the pending challenge.
    async fn verify(&self, input: VerifyInput) -> Result<(), VerificationError>;
}
