use crate::domain_model::{EmailAddress, OtpCode};
use crate::domain_port::{Mailer, TransportError};
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: EmailAddress,
    pub code: OtpCode,
    pub valid_for: Duration,
    pub accepted_at: DateTime<Utc>,
}

/// Records every accepted message instead of talking to a relay. Tests read
/// issued codes out of the outbox; `set_offline` simulates a dead relay.
pub struct MemoryMailer {
    outbox: Mutex<Vec<SentMail>>,
    offline: AtomicBool,
    rejected: AtomicU32,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            rejected: AtomicU32::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn outbox(&self) -> Vec<SentMail> {
        self.outbox.lock().expect("outbox poisoned").clone()
    }

    pub fn rejected_sends(&self) -> u32 {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl Default for MemoryMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Mailer for MemoryMailer {
    async fn deliver_code(
        &self,
        to: &EmailAddress,
        code: &OtpCode,
        valid_for: Duration,
    ) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::Relay("relay offline".to_string()));
        }

        self.outbox.lock().expect("outbox poisoned").push(SentMail {
            to: to.clone(),
            code: code.clone(),
            valid_for,
            accepted_at: Utc::now(),
        });
        Ok(())
    }
}
