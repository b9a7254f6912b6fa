//! OTP Verification Service
//!
//! Validates submitted codes against the store under the configured
//! policy and maps store outcomes to caller-facing reasons. Verification
//! never mutates a credential; that is a separate downstream operation
//! gated on success.

use std::sync::Arc;

use log::info;

use crate::config::OtpPolicy;
use crate::models::VerifyOutcome;
use crate::store::OtpStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{
    messages, normalize_identity, validate_code_format, validate_identity,
};

/// Outcome of a verification request together with its user-facing reason
#[derive(Debug, Clone)]
pub struct VerifyReceipt {
    pub outcome: VerifyOutcome,
    pub message: &'static str,
}

impl VerifyReceipt {
    pub fn is_valid(&self) -> bool {
        self.outcome == VerifyOutcome::Valid
    }
}

/// Service that checks submitted recovery codes
pub struct OtpVerificationService {
    store: Arc<dyn OtpStore>,
    policy: OtpPolicy,
}

impl OtpVerificationService {
    pub fn new(store: Arc<dyn OtpStore>, policy: OtpPolicy) -> Self {
        Self { store, policy }
    }

    /// Check a submitted code for `identity`.
    ///
    /// Malformed input is rejected before the store is touched, so junk
    /// submissions never burn an attempt.
    pub async fn verify(&self, identity: &str, submitted: &str) -> AppResult<VerifyReceipt> {
        let identity = normalize_identity(identity);
        if !validate_identity(&identity) {
            return Err(AppError::Validation(messages::INVALID_IDENTITY.to_string()));
        }

        if !validate_code_format(submitted) {
            return Err(AppError::Validation(messages::INVALID_CODE.to_string()));
        }

        let outcome = self
            .store
            .verify(&identity, submitted, self.policy.ttl(), self.policy.max_attempts)
            .await;

        info!("Verification for {} resolved to {:?}", identity, outcome);

        Ok(VerifyReceipt {
            outcome,
            message: Self::reason(outcome),
        })
    }

    /// Release the record for `identity` once the downstream credential
    /// mutation has completed.
    pub async fn consume(&self, identity: &str) {
        let identity = normalize_identity(identity);
        self.store.invalidate(&identity).await;
        info!("Recovery record consumed for {}", identity);
    }

    fn reason(outcome: VerifyOutcome) -> &'static str {
        match outcome {
            VerifyOutcome::Valid => "success",
            VerifyOutcome::Expired => "code expired, request a new one",
            VerifyOutcome::AttemptsExceeded => "too many attempts, request a new one",
            VerifyOutcome::Mismatched => "incorrect code",
            VerifyOutcome::NotFound => "no pending verification",
        }
    }
}
