use crate::application_impl::{FakeVerificationService, RealVerificationService};
use crate::application_port::VerificationService;
use crate::domain_port::{ChallengeStore, Mailer};
use crate::infra_memory::{MemoryChallengeStore, MemoryMailer};
use crate::infra_redis::RedisChallengeStore;
use crate::infra_smtp::SmtpMailer;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::Arc;
use tracing::info;

pub struct Server {
    pub verification_service: Arc<dyn VerificationService>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let challenge_store: Arc<dyn ChallengeStore> = match settings.challenge.backend.as_str() {
            "memory" => Arc::new(MemoryChallengeStore::new()),
            "redis" => {
                let url = settings.challenge.redis_url.as_deref().ok_or_else(|| {
                    anyhow!("challenge.redis_url is required for the redis backend")
                })?;
                let client = redis::Client::open(url)?;
                let manager = client.get_connection_manager().await?;
                Arc::new(RedisChallengeStore::new(manager, "otp"))
            }
            other => return Err(anyhow!("Unknown challenge backend: {}", other)),
        };

        let mailer: Arc<dyn Mailer> = match settings.mail.backend.as_str() {
            "memory" => Arc::new(MemoryMailer::new()),
            "smtp" => {
                let smtp = settings
                    .mail
                    .smtp
                    .as_ref()
                    .ok_or_else(|| anyhow!("mail.smtp is required for the smtp backend"))?;
                Arc::new(SmtpMailer::try_new(smtp)?)
            }
            other => return Err(anyhow!("Unknown mail backend: {}", other)),
        };

        let verification_service: Arc<dyn VerificationService> =
            match settings.verification.backend.as_str() {
                "fake" => Arc::new(FakeVerificationService::new()),
                "real" => Arc::new(RealVerificationService::new(
                    challenge_store,
                    mailer,
                    settings.challenge.mac_secret.clone().into_bytes(),
                )),
                other => return Err(anyhow!("Unknown verification backend: {}", other)),
            };

        Ok(Self {
            verification_service,
        })
    }

    pub async fn shutdown(&self) {
        // Verification state lives in the store; nothing in flight to drain.
        info!("server shut down");
    }
}
