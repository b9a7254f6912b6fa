//! OTP Store
//!
//! The keyed, expiring, attempt-limited store of issued recovery codes.
//! The store is the single authoritative source of truth for
//! verification; services receive it as a trait object so the in-memory
//! implementation can be swapped for a distributed one without touching
//! the protocol logic.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::VerifyOutcome;

// Re-export the default implementation
pub use memory::InMemoryOtpStore;

/// Storage operations for pending recovery codes.
///
/// Implementations must serialize operations on a single identity's
/// record; operations on different identities must not block each other
/// under load.
#[async_trait]
pub trait OtpStore: Send + Sync + 'static {
    /// Insert or overwrite the record for `identity` with a fresh
    /// `issued_at` and the attempt counter reset to zero. A previously
    /// issued code for the same identity stops verifying immediately.
    async fn put(&self, identity: &str, code: &str);

    /// Verify a submitted code against the record for `identity`.
    ///
    /// Expired records and records at the attempt cap are removed as a
    /// side effect. A mismatch increments the attempt counter and reports
    /// `AttemptsExceeded` once the increment reaches the cap. A match
    /// reports `Valid` but leaves the record in place so the caller can
    /// re-validate at final submission time; the caller must call
    /// [`invalidate`](OtpStore::invalidate) once the code has been
    /// consumed downstream.
    async fn verify(
        &self,
        identity: &str,
        submitted: &str,
        ttl: Duration,
        max_attempts: i32,
    ) -> VerifyOutcome;

    /// Remove the record for `identity`. Calling this for an absent
    /// identity is a no-op.
    async fn invalidate(&self, identity: &str);

    /// When the live record for `identity` was issued, if any. Powers the
    /// resend throttle and the client countdown mirror; never exposes the
    /// code itself.
    async fn issued_at(&self, identity: &str) -> Option<DateTime<Utc>>;

    /// Drop records older than `ttl`, returning how many were removed.
    /// Expiry is enforced lazily at verify time regardless; this bounds
    /// memory for abandoned flows.
    async fn purge_expired(&self, ttl: Duration) -> usize;
}
