use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ChallengeId(pub uuid::Uuid);

impl ChallengeId {
    pub fn generate() -> Self {
        ChallengeId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized (trimmed, lowercased) address. The store key.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct EmailAddress(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid email address")]
pub struct InvalidEmail;

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, InvalidEmail> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (local, domain) = normalized.split_once('@').ok_or(InvalidEmail)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(InvalidEmail);
        }
        if normalized.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidEmail);
        }
        Ok(EmailAddress(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmailAddress({})", self.0)
    }
}

pub const CODE_LEN: usize = 6;

/// Exactly six ASCII digits. The digits never appear in Debug output.
#[derive(Clone, Eq, PartialEq)]
pub struct OtpCode(String);

#[derive(Debug, thiserror::Error)]
#[error("code must be exactly six digits")]
pub struct InvalidCode;

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidCode> {
        let trimmed = raw.trim();
        if trimmed.len() != CODE_LEN || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidCode);
        }
        Ok(OtpCode(trimmed.to_string()))
    }

    /// `n` must be below 10^6.
    pub fn from_number(n: u32) -> Self {
        debug_assert!(n < 1_000_000);
        OtpCode(format!("{:06}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OtpCode(******)")
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChallengeStatus {
    Pending,
    Verified,
    Expired,
    AttemptsExhausted,
    Superseded,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Verified => "verified",
            ChallengeStatus::Expired => "expired",
            ChallengeStatus::AttemptsExhausted => "attempts_exhausted",
            ChallengeStatus::Superseded => "superseded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ChallengeStatus::Pending),
            "verified" => Some(ChallengeStatus::Verified),
            "expired" => Some(ChallengeStatus::Expired),
            "attempts_exhausted" => Some(ChallengeStatus::AttemptsExhausted),
            "superseded" => Some(ChallengeStatus::Superseded),
            _ => None,
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InvalidateReason {
    Expired,
    Superseded,
    AttemptsExhausted,
}

impl InvalidateReason {
    pub fn status(self) -> ChallengeStatus {
        match self {
            InvalidateReason::Expired => ChallengeStatus::Expired,
            InvalidateReason::Superseded => ChallengeStatus::Superseded,
            InvalidateReason::AttemptsExhausted => ChallengeStatus::AttemptsExhausted,
        }
    }
}

/// Server-side record of an issued code. Only the keyed MAC of the code is
/// kept; the digits live in the issuing call frame and the rendered email.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub id: ChallengeId,
    pub email: EmailAddress,
    pub code_mac_hex: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts_remaining: u32,
    pub status: ChallengeStatus,
}

impl OtpChallenge {
    pub fn is_pending(&self) -> bool {
        self.status == ChallengeStatus::Pending
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
