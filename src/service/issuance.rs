//! OTP Issuance Service
//!
//! Orchestrates code generation, storage, and dispatch through the email
//! gateway. Issuing again for the same identity always supersedes the
//! previous code.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::OtpPolicy;
use crate::service::email_service::RecoveryMailer;
use crate::service::generator::OtpGenerator;
use crate::store::OtpStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{messages, normalize_identity, validate_identity};

/// What the caller learns from a successful issuance. The code itself is
/// deliberately absent; it travels only through the gateway.
#[derive(Debug, Clone)]
pub struct IssueReceipt {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Validity window in seconds, for the client countdown display
    pub expires_in: i64,
}

/// Service that issues recovery codes
pub struct OtpIssuanceService {
    store: Arc<dyn OtpStore>,
    mailer: Option<Arc<dyn RecoveryMailer>>,
    generator: OtpGenerator,
    policy: OtpPolicy,
}

impl OtpIssuanceService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        mailer: Option<Arc<dyn RecoveryMailer>>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            store,
            mailer,
            generator: OtpGenerator::new(),
            policy,
        }
    }

    /// Issue a fresh code for `identity` and dispatch it by email.
    ///
    /// The gateway must be configured before any code is generated or
    /// stored. A dispatch failure after the store mutation does not roll
    /// the record back; the caller is told dispatch failed and may
    /// trigger a resend.
    pub async fn issue(
        &self,
        identity: &str,
        display_name: Option<&str>,
    ) -> AppResult<IssueReceipt> {
        let mailer = self.mailer.as_ref().ok_or_else(|| {
            AppError::Configuration("email gateway credentials are not configured".to_string())
        })?;

        let identity = normalize_identity(identity);
        if !validate_identity(&identity) {
            return Err(AppError::Validation(messages::INVALID_IDENTITY.to_string()));
        }

        self.check_resend_interval(&identity).await?;

        let code = self.generator.generate()?;
        self.store.put(&identity, &code).await;
        info!("Issued recovery code for {}", identity);

        // The store lock is released; dispatch blocks only this request.
        let greeting = display_name.filter(|name| !name.trim().is_empty());
        match mailer
            .send_recovery_code(
                &identity,
                greeting.unwrap_or(&identity),
                &code,
                self.policy.ttl_minutes,
            )
            .await
        {
            Ok(()) => Ok(IssueReceipt {
                message: "A recovery code has been sent to your email address".to_string(),
                timestamp: Utc::now(),
                expires_in: self.policy.ttl_seconds(),
            }),
            Err(err) => {
                warn!("Recovery code stored but dispatch failed for {}", identity);
                Err(err)
            }
        }
    }

    async fn check_resend_interval(&self, identity: &str) -> AppResult<()> {
        if self.policy.resend_interval_seconds <= 0 {
            return Ok(());
        }

        if let Some(issued_at) = self.store.issued_at(identity).await {
            let next_allowed = issued_at + self.policy.resend_interval();
            if Utc::now() < next_allowed {
                return Err(AppError::RateLimit(
                    "A code was sent recently, please wait before requesting another".to_string(),
                ));
            }
        }

        Ok(())
    }
}
