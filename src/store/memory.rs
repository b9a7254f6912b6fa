//! In-Memory OTP Store
//!
//! Sharded lock-table implementation of [`OtpStore`]. Each identity maps
//! to one shard; operations on a single identity are serialized by its
//! shard mutex while identities on different shards proceed
//! independently. No lock is ever held across an await point.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::{OtpRecord, VerifyOutcome};
use crate::store::OtpStore;

const SHARD_COUNT: usize = 16;

/// Concurrency-safe keyed store of pending recovery codes
pub struct InMemoryOtpStore {
    shards: Vec<Mutex<HashMap<String, OtpRecord>>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    fn shard(&self, identity: &str) -> &Mutex<HashMap<String, OtpRecord>> {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    fn lock_shard<'a>(
        shard: &'a Mutex<HashMap<String, OtpRecord>>,
    ) -> std::sync::MutexGuard<'a, HashMap<String, OtpRecord>> {
        shard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, identity: &str, code: &str) {
        let mut records = Self::lock_shard(self.shard(identity));
        records.insert(
            identity.to_string(),
            OtpRecord::new(identity, code, Utc::now()),
        );
    }

    async fn verify(
        &self,
        identity: &str,
        submitted: &str,
        ttl: Duration,
        max_attempts: i32,
    ) -> VerifyOutcome {
        let mut records = Self::lock_shard(self.shard(identity));

        let record = match records.get_mut(identity) {
            Some(record) => record,
            None => return VerifyOutcome::NotFound,
        };

        if record.is_expired(ttl) {
            records.remove(identity);
            return VerifyOutcome::Expired;
        }

        if record.has_exceeded_max_attempts(max_attempts) {
            records.remove(identity);
            return VerifyOutcome::AttemptsExceeded;
        }

        if record.consumed {
            records.remove(identity);
            return VerifyOutcome::NotFound;
        }

        if record.code != submitted {
            record.attempts += 1;
            return if record.has_exceeded_max_attempts(max_attempts) {
                VerifyOutcome::AttemptsExceeded
            } else {
                VerifyOutcome::Mismatched
            };
        }

        // The record stays in place until the caller invalidates it, so
        // the final credential mutation can re-validate the same code.
        VerifyOutcome::Valid
    }

    async fn invalidate(&self, identity: &str) {
        let mut records = Self::lock_shard(self.shard(identity));
        records.remove(identity);
    }

    async fn issued_at(&self, identity: &str) -> Option<DateTime<Utc>> {
        let records = Self::lock_shard(self.shard(identity));
        records.get(identity).map(|record| record.issued_at)
    }

    async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut purged = 0;
        for shard in &self.shards {
            let mut records = Self::lock_shard(shard);
            let before = records.len();
            records.retain(|_, record| !record.is_expired(ttl));
            purged += before - records.len();
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_ATTEMPTS: i32 = 3;

    fn ttl() -> Duration {
        Duration::minutes(10)
    }

    #[tokio::test]
    async fn test_verify_without_record_is_not_found() {
        let store = InMemoryOtpStore::new();
        let outcome = store
            .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
            .await;
        assert_eq!(outcome, VerifyOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_put_then_verify_valid() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "123456").await;

        let outcome = store
            .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
            .await;
        assert_eq!(outcome, VerifyOutcome::Valid);
    }

    #[tokio::test]
    async fn test_reissue_supersedes_previous_code() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "111111").await;
        store.put("alice@example.com", "222222").await;

        let old = store
            .verify("alice@example.com", "111111", ttl(), MAX_ATTEMPTS)
            .await;
        assert_eq!(old, VerifyOutcome::Mismatched);

        let new = store
            .verify("alice@example.com", "222222", ttl(), MAX_ATTEMPTS)
            .await;
        assert_eq!(new, VerifyOutcome::Valid);
    }

    #[tokio::test]
    async fn test_reissue_resets_attempt_counter() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "111111").await;
        store
            .verify("alice@example.com", "000000", ttl(), MAX_ATTEMPTS)
            .await;
        store
            .verify("alice@example.com", "000000", ttl(), MAX_ATTEMPTS)
            .await;

        store.put("alice@example.com", "222222").await;

        // Two more wrong attempts fit under the cap again
        assert_eq!(
            store
                .verify("alice@example.com", "000000", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Mismatched
        );
        assert_eq!(
            store
                .verify("alice@example.com", "222222", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Valid
        );
    }

    #[tokio::test]
    async fn test_expired_record_is_invalidated() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "123456").await;

        let short_ttl = Duration::milliseconds(20);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let outcome = store
            .verify("alice@example.com", "123456", short_ttl, MAX_ATTEMPTS)
            .await;
        assert_eq!(outcome, VerifyOutcome::Expired);

        // The record was removed, not merely flagged
        let again = store
            .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
            .await;
        assert_eq!(again, VerifyOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_attempt_cap_sequence() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "123456").await;

        assert_eq!(
            store
                .verify("alice@example.com", "000000", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Mismatched
        );
        assert_eq!(
            store
                .verify("alice@example.com", "000000", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Mismatched
        );

        // The cap-th wrong submission reports exhaustion
        assert_eq!(
            store
                .verify("alice@example.com", "000000", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::AttemptsExceeded
        );

        // Even the correct code fails once the cap is reached
        assert_eq!(
            store
                .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::AttemptsExceeded
        );

        // The exhausted record is gone afterwards
        assert_eq!(
            store
                .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_valid_is_repeatable_until_invalidated() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "123456").await;

        assert_eq!(
            store
                .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Valid
        );

        // Re-validation at final submission time still succeeds
        assert_eq!(
            store
                .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Valid
        );

        store.invalidate("alice@example.com").await;

        assert_eq!(
            store
                .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let store = InMemoryOtpStore::new();
        store.invalidate("nobody@example.com").await;
        store.invalidate("nobody@example.com").await;

        store.put("alice@example.com", "123456").await;
        store.invalidate("alice@example.com").await;
        store.invalidate("alice@example.com").await;

        assert_eq!(
            store
                .verify("alice@example.com", "123456", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_identities_do_not_interfere() {
        let store = InMemoryOtpStore::new();
        store.put("alice@example.com", "111111").await;
        store.put("bob@example.com", "222222").await;

        store.invalidate("alice@example.com").await;

        assert_eq!(
            store
                .verify("bob@example.com", "222222", ttl(), MAX_ATTEMPTS)
                .await,
            VerifyOutcome::Valid
        );
    }

    #[tokio::test]
    async fn test_issued_at_reflects_live_record() {
        let store = InMemoryOtpStore::new();
        assert!(store.issued_at("alice@example.com").await.is_none());

        let before = Utc::now();
        store.put("alice@example.com", "123456").await;
        let issued = store.issued_at("alice@example.com").await.unwrap();
        assert!(issued >= before && issued <= Utc::now());
    }

    #[tokio::test]
    async fn test_purge_expired_drops_only_stale_records() {
        let store = InMemoryOtpStore::new();
        store.put("stale@example.com", "111111").await;

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        store.put("fresh@example.com", "222222").await;

        let purged = store.purge_expired(Duration::milliseconds(20)).await;
        assert_eq!(purged, 1);

        assert!(store.issued_at("stale@example.com").await.is_none());
        assert!(store.issued_at("fresh@example.com").await.is_some());
    }
}
