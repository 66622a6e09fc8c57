use crate::domain_model::{ChallengeStatus, EmailAddress, InvalidateReason, OtpChallenge};
use crate::domain_port::{ChallengeStore, ChallengeStoreError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

/// One record per address; the map's entry guard serializes every mutation
/// for a given address. A consumed record keeps its terminal status until
/// the next issuance overwrites it, so `expired` and `attempts_exhausted`
/// stay distinguishable from `not_found`.
pub struct MemoryChallengeStore {
    challenges: DashMap<EmailAddress, OtpChallenge>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self {
            challenges: DashMap::new(),
        }
    }
}

impl Default for MemoryChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put_pending(&self, challenge: OtpChallenge) -> Result<(), ChallengeStoreError> {
        let id = challenge.id;
        let email = challenge.email.clone();
        if let Some(prev) = self.challenges.insert(email.clone(), challenge) {
            if prev.is_pending() {
                debug!(%email, old = %prev.id, new = %id, "superseded pending challenge");
            }
        }
        Ok(())
    }

    async fn lookup_pending(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<OtpChallenge>, ChallengeStoreError> {
        Ok(self
            .challenges
            .get(email)
            .filter(|c| c.is_pending())
            .map(|c| c.value().clone()))
    }

    async fn verify_and_consume(
        &self,
        email: &EmailAddress,
        provided_mac_hex: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ChallengeStoreError> {
        let mut entry = self
            .challenges
            .get_mut(email)
            .ok_or(ChallengeStoreError::NotFound)?;
        let challenge = entry.value_mut();

        match challenge.status {
            ChallengeStatus::Pending => {}
            ChallengeStatus::Expired => return Err(ChallengeStoreError::Expired),
            ChallengeStatus::AttemptsExhausted => {
                return Err(ChallengeStoreError::AttemptsExhausted);
            }
            // Consumed or replaced records read as gone.
            ChallengeStatus::Verified | ChallengeStatus::Superseded => {
                return Err(ChallengeStoreError::NotFound);
            }
        }

        if challenge.is_expired_at(now) {
            challenge.status = ChallengeStatus::Expired;
            return Err(ChallengeStoreError::Expired);
        }
        if challenge.attempts_remaining == 0 {
            challenge.status = ChallengeStatus::AttemptsExhausted;
            return Err(ChallengeStoreError::AttemptsExhausted);
        }

        if challenge.code_mac_hex != provided_mac_hex {
            challenge.attempts_remaining -= 1;
            if challenge.attempts_remaining == 0 {
                challenge.status = ChallengeStatus::AttemptsExhausted;
                return Err(ChallengeStoreError::AttemptsExhausted);
            }
            return Err(ChallengeStoreError::Mismatch {
                remaining_attempts: challenge.attempts_remaining,
            });
        }

        challenge.status = ChallengeStatus::Verified;
        Ok(())
    }

    async fn invalidate(
        &self,
        email: &EmailAddress,
        reason: InvalidateReason,
    ) -> Result<(), ChallengeStoreError> {
        if let Some(mut entry) = self.challenges.get_mut(email) {
            let challenge = entry.value_mut();
            if challenge.is_pending() {
                challenge.status = reason.status();
                debug!(email = %email, id = %challenge.id, status = %challenge.status,
                    "challenge invalidated");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::ChallengeId;
    use chrono::TimeDelta;

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::parse(raw).unwrap()
    }

    fn pending(raw_email: &str, mac: &str, issued_at: DateTime<Utc>) -> OtpChallenge {
        OtpChallenge {
            id: ChallengeId::generate(),
            email: email(raw_email),
            code_mac_hex: mac.to_string(),
            issued_at,
            expires_at: issued_at + TimeDelta::seconds(600),
            attempts_remaining: 5,
            status: ChallengeStatus::Pending,
        }
    }

    #[tokio::test]
    async fn correct_mac_verifies_and_consumes() {
        let store = MemoryChallengeStore::new();
        let now = Utc::now();
        store.put_pending(pending("a@x.com", "mac-1", now)).await.unwrap();

        store
            .verify_and_consume(&email("a@x.com"), "mac-1", now)
            .await
            .unwrap();
        let again = store
            .verify_and_consume(&email("a@x.com"), "mac-1", now)
            .await;
        assert!(matches!(again, Err(ChallengeStoreError::NotFound)));
    }

    #[tokio::test]
    async fn unknown_address_is_not_found() {
        let store = MemoryChallengeStore::new();
        let result = store
            .verify_and_consume(&email("ghost@x.com"), "mac", Utc::now())
            .await;
        assert!(matches!(result, Err(ChallengeStoreError::NotFound)));
    }

    #[tokio::test]
    async fn attempts_strictly_decrease_until_exhaustion() {
        let store = MemoryChallengeStore::new();
        let now = Utc::now();
        store.put_pending(pending("a@x.com", "mac-1", now)).await.unwrap();

        for expected_left in [4u32, 3, 2, 1] {
            let result = store
                .verify_and_consume(&email("a@x.com"), "wrong", now)
                .await;
            match result {
                Err(ChallengeStoreError::Mismatch { remaining_attempts }) => {
                    assert_eq!(remaining_attempts, expected_left);
                }
                other => panic!("expected mismatch, got {:?}", other),
            }
        }

        let fifth = store
            .verify_and_consume(&email("a@x.com"), "wrong", now)
            .await;
        assert!(matches!(fifth, Err(ChallengeStoreError::AttemptsExhausted)));

        // Even the correct mac is dead after exhaustion.
        let late = store
            .verify_and_consume(&email("a@x.com"), "mac-1", now)
            .await;
        assert!(matches!(late, Err(ChallengeStoreError::AttemptsExhausted)));
    }

    #[tokio::test]
    async fn expiry_boundary_is_exclusive() {
        let store = MemoryChallengeStore::new();
        let issued_at = Utc::now();
        store
            .put_pending(pending("a@x.com", "mac-1", issued_at))
            .await
            .unwrap();
        let expires_at = issued_at + TimeDelta::seconds(600);

        // One second past expiry rejects even the correct mac.
        let store2 = MemoryChallengeStore::new();
        store2
            .put_pending(pending("b@x.com", "mac-1", issued_at))
            .await
            .unwrap();
        let late = store2
            .verify_and_consume(&email("b@x.com"), "mac-1", expires_at + TimeDelta::seconds(1))
            .await;
        assert!(matches!(late, Err(ChallengeStoreError::Expired)));

        // One second before expiry still verifies.
        store
            .verify_and_consume(&email("a@x.com"), "mac-1", expires_at - TimeDelta::seconds(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_record_keeps_reporting_expired() {
        let store = MemoryChallengeStore::new();
        let issued_at = Utc::now();
        store
            .put_pending(pending("a@x.com", "mac-1", issued_at))
            .await
            .unwrap();
        let after = issued_at + TimeDelta::seconds(601);

        for _ in 0..2 {
            let result = store
                .verify_and_consume(&email("a@x.com"), "mac-1", after)
                .await;
            assert!(matches!(result, Err(ChallengeStoreError::Expired)));
        }
    }

    #[tokio::test]
    async fn reissue_supersedes_old_pending() {
        let store = MemoryChallengeStore::new();
        let now = Utc::now();
        store.put_pending(pending("a@x.com", "mac-1", now)).await.unwrap();
        store.put_pending(pending("a@x.com", "mac-2", now)).await.unwrap();

        // The old code now burns an attempt on the new challenge.
        let stale = store
            .verify_and_consume(&email("a@x.com"), "mac-1", now)
            .await;
        assert!(matches!(
            stale,
            Err(ChallengeStoreError::Mismatch {
                remaining_attempts: 4
            })
        ));

        store
            .verify_and_consume(&email("a@x.com"), "mac-2", now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lookup_sees_only_pending() {
        let store = MemoryChallengeStore::new();
        let now = Utc::now();
        store.put_pending(pending("a@x.com", "mac-1", now)).await.unwrap();
        assert!(store.lookup_pending(&email("a@x.com")).await.unwrap().is_some());

        store
            .verify_and_consume(&email("a@x.com"), "mac-1", now)
            .await
            .unwrap();
        assert!(store.lookup_pending(&email("a@x.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let store = MemoryChallengeStore::new();
        let now = Utc::now();
        store.put_pending(pending("a@x.com", "mac-1", now)).await.unwrap();

        store
            .invalidate(&email("a@x.com"), InvalidateReason::Expired)
            .await
            .unwrap();
        store
            .invalidate(&email("a@x.com"), InvalidateReason::Superseded)
            .await
            .unwrap();
        store
            .invalidate(&email("nobody@x.com"), InvalidateReason::Expired)
            .await
            .unwrap();

        let result = store
            .verify_and_consume(&email("a@x.com"), "mac-1", now)
            .await;
        assert!(matches!(result, Err(ChallengeStoreError::Expired)));
    }

    #[tokio::test]
    async fn concurrent_verifies_cannot_double_spend() {
        use std::sync::Arc;

        let store = Arc::new(MemoryChallengeStore::new());
        let now = Utc::now();
        store.put_pending(pending("a@x.com", "mac-1", now)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .verify_and_consume(&EmailAddress::parse("a@x.com").unwrap(), "mac-1", now)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
