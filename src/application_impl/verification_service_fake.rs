use crate::application_port::{
    IssueInput, IssueReceipt, VerificationError, VerificationService, VerifyInput,
};
use chrono::Utc;
use std::time::Duration;

/// Deterministic backend for UI work and tests. `123456` always verifies,
/// `000000` simulates an internal fault, `999999` simulates an exhausted
/// attempt budget, anything else is a mismatch.
#[derive(Debug)]
pub struct FakeVerificationService;

impl FakeVerificationService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeVerificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VerificationService for FakeVerificationService {
    async fn request_code(&self, _input: IssueInput) -> Result<IssueReceipt, VerificationError> {
        Ok(IssueReceipt {
            expires_at: Utc::now() + Duration::from_secs(600),
        })
    }

    async fn verify(&self, input: VerifyInput) -> Result<(), VerificationError> {
        match input.code.as_str() {
            "123456" => Ok(()),
            "000000" => Err(VerificationError::InternalError(anyhow::anyhow!(
                "simulated internal error"
            ))),
            "999999" => Err(VerificationError::AttemptsExhausted),
            _ => Err(VerificationError::Mismatch {
                remaining_attempts: 4,
            }),
        }
    }
}
