use crate::application_port::{
    IssueInput, IssueReceipt, VerificationError, VerificationService, VerifyInput,
};
use crate::domain_model::{
    ChallengeId, ChallengeStatus, EmailAddress, InvalidateReason, OtpChallenge, OtpCode,
};
use crate::domain_port::{ChallengeStore, Mailer};
use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use rand::Rng;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CODE_TTL: Duration = Duration::from_secs(600);
const MAX_ATTEMPTS: u32 = 5;

pub struct RealVerificationService {
    store: Arc<dyn ChallengeStore>,
    mailer: Arc<dyn Mailer>,
    mac_key: Vec<u8>,
}

impl RealVerificationService {
    pub fn new(store: Arc<dyn ChallengeStore>, mailer: Arc<dyn Mailer>, mac_key: Vec<u8>) -> Self {
        Self {
            store,
            mailer,
            mac_key,
        }
    }

    fn generate_code() -> OtpCode {
        let mut rng = OsRng;
        OtpCode::from_number(rng.gen_range(0..1_000_000))
    }

    fn mac_hex(&self, code: &OtpCode) -> anyhow::Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.mac_key)?;
        mac.update(code.as_str().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait::async_trait]
impl VerificationService for RealVerificationService {
    async fn request_code(&self, input: IssueInput) -> Result<IssueReceipt, VerificationError> {
        let email =
            EmailAddress::parse(&input.email).map_err(|_| VerificationError::InvalidEmail)?;

        let code = Self::generate_code();
        let issued_at = Utc::now();
        let challenge = OtpChallenge {
            id: ChallengeId::generate(),
            email: email.clone(),
            code_mac_hex: self.mac_hex(&code)?,
            issued_at,
            expires_at: issued_at + CODE_TTL,
            attempts_remaining: MAX_ATTEMPTS,
            status: ChallengeStatus::Pending,
        };
        let id = challenge.id;
        let expires_at = challenge.expires_at;
        self.store.put_pending(challenge).await?;

        let mut sent = self.mailer.deliver_code(&email, &code, CODE_TTL).await;
        if let Err(err) = &sent {
            if err.is_retryable() {
                warn!(%email, %id, error = %err, "delivery failed, retrying once");
                sent = self.mailer.deliver_code(&email, &code, CODE_TTL).await;
            }
        }
        if let Err(err) = sent {
            // The challenge must not stay pending for a code nobody received.
            self.store
                .invalidate(&email, InvalidateReason::Expired)
                .await?;
            warn!(%email, %id, error = %err, "delivery failed, challenge invalidated");
            return Err(VerificationError::Delivery(err));
        }

        info!(%email, %id, "verification code issued");
        Ok(IssueReceipt { expires_at })
    }

    async fn verify(&self, input: VerifyInput) -> Result<(), VerificationError> {
        let email =
            EmailAddress::parse(&input.email).map_err(|_| VerificationError::InvalidEmail)?;
        let code = OtpCode::parse(&input.code).map_err(|_| VerificationError::InvalidCode)?;

        let provided_mac = self.mac_hex(&code)?;
        self.store
            .verify_and_consume(&email, &provided_mac, Utc::now())
            .await?;

        info!(%email, "verification code accepted");
        Ok(())
    }
}
