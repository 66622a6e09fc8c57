use crate::domain_model::{EmailAddress, OtpCode};
use std::time::Duration;

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Render and send the code to `to`. Resolves `Ok` only once the relay
    /// has accepted the message; final mailbox delivery is unobservable.
    async fn deliver_code(
        &self,
        to: &EmailAddress,
        code: &OtpCode,
        valid_for: Duration,
    ) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("relay rejected or unreachable: {0}")]
    Relay(String),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("message could not be built: {0}")]
    Message(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Relay(_) | TransportError::Timeout(_))
    }
}
