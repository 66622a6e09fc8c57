use crate::domain_model::{
    ChallengeId, ChallengeStatus, EmailAddress, InvalidateReason, OtpChallenge,
};
use crate::domain_port::{ChallengeStore, ChallengeStoreError};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::debug;

const OTP_PUT: &str = include_str!("otp_put.lua");
const OTP_VERIFY: &str = include_str!("otp_verify.lua");
const OTP_INVALIDATE: &str = r#"
if redis.call('HGET', KEYS[1], 'status') == 'pending' then
  redis.call('HSET', KEYS[1], 'status', ARGV[1])
  return 1
end
return 0
"#;

/// Keys outlive logical expiry by this much so `expired` stays
/// distinguishable from `not_found`; eviction past that is retention GC.
const RETENTION_GRACE_SECS: i64 = 3600;

pub struct RedisChallengeStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisChallengeStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisChallengeStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, email: &EmailAddress) -> String {
        format!("{}:{}", self.prefix, email)
    }
}

fn field<'a>(
    fields: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, ChallengeStoreError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ChallengeStoreError::Store(format!("challenge record missing '{}'", name)))
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, ChallengeStoreError> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| ChallengeStoreError::Store(format!("bad timestamp '{}'", raw)))
}

#[async_trait::async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put_pending(&self, challenge: OtpChallenge) -> Result<(), ChallengeStoreError> {
        let key = self.key(&challenge.email);
        let mut conn = self.conn.clone();
        let script = Script::new(OTP_PUT);
        let superseded: Option<String> = script
            .key(&key)
            .arg(challenge.id.to_string())
            .arg(&challenge.code_mac_hex)
            .arg(challenge.issued_at.timestamp())
            .arg(challenge.expires_at.timestamp())
            .arg(i64::from(challenge.attempts_remaining))
            .arg(challenge.expires_at.timestamp() + RETENTION_GRACE_SECS)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ChallengeStoreError::Store(e.to_string()))?;

        if let Some(old_id) = superseded {
            debug!(email = %challenge.email, old = %old_id, new = %challenge.id,
                "superseded pending challenge");
        }
        Ok(())
    }

    async fn lookup_pending(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<OtpChallenge>, ChallengeStoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| ChallengeStoreError::Store(e.to_string()))?;
        if fields.is_empty() {
            return Ok(None);
        }

        let status = ChallengeStatus::parse(field(&fields, "status")?)
            .ok_or_else(|| ChallengeStoreError::Store("bad status field".to_string()))?;
        if status != ChallengeStatus::Pending {
            return Ok(None);
        }

        let id = field(&fields, "id")?
            .parse::<uuid::Uuid>()
            .map_err(|e| ChallengeStoreError::Store(e.to_string()))?;
        let attempts_remaining = field(&fields, "tries")?
            .parse::<u32>()
            .map_err(|e| ChallengeStoreError::Store(e.to_string()))?;

        Ok(Some(OtpChallenge {
            id: ChallengeId(id),
            email: email.clone(),
            code_mac_hex: field(&fields, "mac")?.to_string(),
            issued_at: parse_ts(field(&fields, "issued_at")?)?,
            expires_at: parse_ts(field(&fields, "expires_at")?)?,
            attempts_remaining,
            status,
        }))
    }

    async fn verify_and_consume(
        &self,
        email: &EmailAddress,
        provided_mac_hex: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ChallengeStoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let script = Script::new(OTP_VERIFY);
        let (outcome, left): (i64, i64) = script
            .key(&key)
            .arg(provided_mac_hex)
            .arg(now.timestamp())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ChallengeStoreError::Store(e.to_string()))?;

        match outcome {
            1 => Ok(()),
            0 => Err(ChallengeStoreError::Mismatch {
                remaining_attempts: left as u32,
            }),
            -1 => Err(ChallengeStoreError::NotFound),
            -2 => Err(ChallengeStoreError::Expired),
            -3 => Err(ChallengeStoreError::AttemptsExhausted),
            _ => Err(ChallengeStoreError::InternalError(anyhow!(
                "unknown script outcome"
            ))),
        }
    }

    async fn invalidate(
        &self,
        email: &EmailAddress,
        reason: InvalidateReason,
    ) -> Result<(), ChallengeStoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let script = Script::new(OTP_INVALIDATE);
        let transitioned: i64 = script
            .key(&key)
            .arg(reason.status().as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ChallengeStoreError::Store(e.to_string()))?;

        if transitioned == 1 {
            debug!(email = %email, status = %reason.status(), "challenge invalidated");
        }
        Ok(())
    }
}
