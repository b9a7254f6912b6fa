//! OTP Record Model
//!
//! Data structures for the one-time-password records held by the store.
//! A record is the single authoritative source of truth for verifying a
//! submitted code; at most one live record exists per identity.

use chrono::{DateTime, Duration, Utc};

/// A pending one-time password bound to an identity.
///
/// Deliberately not serializable: the code value must never leave the
/// store through a log line or a response body.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    /// Email address or username the code is bound to
    pub identity: String,
    /// 6-digit numeric code, zero-padded
    pub code: String,
    /// When the code was issued
    pub issued_at: DateTime<Utc>,
    /// Number of failed verification attempts made
    pub attempts: i32,
    /// Whether a successful verification has been acted upon downstream
    pub consumed: bool,
}

impl OtpRecord {
    /// Creates a fresh record for an identity, attempts reset to zero
    pub fn new(identity: &str, code: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            code: code.to_string(),
            issued_at,
            attempts: 0,
            consumed: false,
        }
    }

    /// Check if the record has outlived the given TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.issued_at > ttl
    }

    /// Check if the record has reached the attempt cap
    pub fn has_exceeded_max_attempts(&self, max_attempts: i32) -> bool {
        self.attempts >= max_attempts
    }

    /// Check if this record can still be used for verification
    pub fn is_usable(&self, ttl: Duration, max_attempts: i32) -> bool {
        !self.is_expired(ttl) && !self.consumed && !self.has_exceeded_max_attempts(max_attempts)
    }

    /// Remaining validity in seconds, zero once expired
    pub fn remaining_seconds(&self, ttl: Duration) -> i64 {
        let expires_at = self.issued_at + ttl;
        let now = Utc::now();
        if now >= expires_at {
            0
        } else {
            (expires_at - now).num_seconds()
        }
    }
}

/// Outcome of verifying a submitted code against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The submitted code matches a live record
    Valid,
    /// The record's TTL has elapsed
    Expired,
    /// The submitted code does not match
    Mismatched,
    /// The attempt cap was reached
    AttemptsExceeded,
    /// No pending record exists for the identity
    NotFound,
}
