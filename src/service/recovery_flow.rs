//! Recovery Flow Controller
//!
//! The client-visible state machine sequencing a password recovery:
//! identify account, await the emailed code, verify it, set a new
//! password, done. One controller drives both entry points: the
//! self-service "forgot password" flow and the administrator-forced
//! reset differ only in how the identity is discovered.
//!
//! The controller's view of a verified code is advisory: the credential
//! directory re-validates the code server-side when the mutation is
//! submitted, so a client that skips ahead with a guessed code is still
//! rejected.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::info;
use thiserror::Error;

use crate::service::issuance::OtpIssuanceService;
use crate::service::verification::{OtpVerificationService, VerifyReceipt};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_password_policy;

/// Steps of the recovery flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    IdentifyAccount,
    AwaitOtp,
    VerifyOtp,
    SetPassword,
    Done,
}

/// How the identity under recovery is discovered
#[derive(Debug, Clone)]
pub enum IdentitySource {
    /// User-initiated, not yet authenticated: the user enters their email
    SelfService { email: String },
    /// Administrator-forced reset for a known account: the email is
    /// looked up from the username
    AdminReset { username: String },
}

/// Account details resolved by the credential directory
#[derive(Debug, Clone)]
pub struct AccountStatus {
    pub needs_reset: bool,
    pub email: String,
    pub full_name: Option<String>,
}

/// Result of a downstream credential mutation
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: String,
}

/// External collaborator owning account lookup and credential mutation.
///
/// The mutation endpoint is expected to re-validate the submitted code
/// itself rather than trust this controller's earlier verification.
#[async_trait]
pub trait CredentialDirectory: Send + Sync + 'static {
    async fn check_account_needs_reset(&self, identity: &str) -> AppResult<AccountStatus>;

    async fn mutate_credential(
        &self,
        identity: &str,
        otp: &str,
        new_password: &str,
    ) -> AppResult<MutationOutcome>;
}

/// Errors raised by the flow controller
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("cannot {action} during the {step:?} step")]
    InvalidTransition {
        step: RecoveryStep,
        action: &'static str,
    },

    #[error("this account has no pending password reset")]
    AccountNotEligible,

    #[error("{0}")]
    PasswordPolicy(String),

    #[error(transparent)]
    Service(#[from] AppError),
}

/// One in-progress recovery attempt.
///
/// The flow is ephemeral: dropping it (close, cancel, navigation away)
/// needs no server-side cleanup beyond natural code expiry.
pub struct RecoveryFlow {
    issuance: Arc<OtpIssuanceService>,
    verification: Arc<OtpVerificationService>,
    directory: Arc<dyn CredentialDirectory>,
    step: RecoveryStep,
    identity: Option<String>,
    display_name: Option<String>,
    pending_code: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl RecoveryFlow {
    pub fn new(
        issuance: Arc<OtpIssuanceService>,
        verification: Arc<OtpVerificationService>,
        directory: Arc<dyn CredentialDirectory>,
    ) -> Self {
        Self {
            issuance,
            verification,
            directory,
            step: RecoveryStep::IdentifyAccount,
            identity: None,
            display_name: None,
            pending_code: None,
            expires_at: None,
        }
    }

    pub fn step(&self) -> RecoveryStep {
        self.step
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Countdown mirror of the server TTL, for display only. The store's
    /// own expiry check remains authoritative.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Resolve the identity and issue the first code.
    pub async fn identify(&mut self, source: IdentitySource) -> Result<RecoveryStep, FlowError> {
        if self.step != RecoveryStep::IdentifyAccount {
            return Err(FlowError::InvalidTransition {
                step: self.step,
                action: "identify the account",
            });
        }

        let (identity, display_name) = match source {
            IdentitySource::SelfService { email } => (email, None),
            IdentitySource::AdminReset { username } => {
                let status = self.directory.check_account_needs_reset(&username).await?;
                if !status.needs_reset {
                    return Err(FlowError::AccountNotEligible);
                }
                (status.email, status.full_name)
            }
        };

        let receipt = self
            .issuance
            .issue(&identity, display_name.as_deref())
            .await?;

        self.identity = Some(identity);
        self.display_name = display_name;
        self.expires_at = Some(receipt.timestamp + Duration::seconds(receipt.expires_in));
        self.step = RecoveryStep::AwaitOtp;
        Ok(self.step)
    }

    /// Submit the code the user typed. Success advances to SetPassword;
    /// failure returns to AwaitOtp with the reason surfaced in the
    /// receipt.
    pub async fn submit_code(&mut self, code: &str) -> Result<VerifyReceipt, FlowError> {
        if !matches!(self.step, RecoveryStep::AwaitOtp | RecoveryStep::VerifyOtp) {
            return Err(FlowError::InvalidTransition {
                step: self.step,
                action: "submit a code",
            });
        }

        let identity = self.require_identity()?;
        self.step = RecoveryStep::VerifyOtp;

        let receipt = match self.verification.verify(&identity, code).await {
            Ok(receipt) => receipt,
            Err(err) => {
                // Malformed input never reached the store; keep the flow
                // on the code-entry step
                self.step = RecoveryStep::AwaitOtp;
                return Err(err.into());
            }
        };
        if receipt.is_valid() {
            self.pending_code = Some(code.to_string());
            self.step = RecoveryStep::SetPassword;
        } else {
            self.pending_code = None;
            self.step = RecoveryStep::AwaitOtp;
        }
        Ok(receipt)
    }

    /// Request a fresh code. The previous code stops verifying, any code
    /// the user already typed is discarded, and the countdown restarts.
    pub async fn resend(&mut self) -> Result<RecoveryStep, FlowError> {
        if !matches!(self.step, RecoveryStep::AwaitOtp | RecoveryStep::VerifyOtp) {
            return Err(FlowError::InvalidTransition {
                step: self.step,
                action: "resend a code",
            });
        }

        let identity = self.require_identity()?;
        let display_name = self.display_name.clone();
        let receipt = self.issuance.issue(&identity, display_name.as_deref()).await?;

        self.pending_code = None;
        self.expires_at = Some(receipt.timestamp + Duration::seconds(receipt.expires_in));
        self.step = RecoveryStep::AwaitOtp;
        Ok(self.step)
    }

    /// Validate the candidate password locally, then submit the
    /// credential mutation. The directory re-validates the code; on
    /// success the record is invalidated and the flow completes.
    pub async fn set_password(&mut self, new_password: &str) -> Result<MutationOutcome, FlowError> {
        if self.step != RecoveryStep::SetPassword {
            return Err(FlowError::InvalidTransition {
                step: self.step,
                action: "set a password",
            });
        }

        validate_password_policy(new_password)
            .map_err(|e| FlowError::PasswordPolicy(e.code.to_string()))?;

        let identity = self.require_identity()?;
        let code = self.pending_code.clone().ok_or(FlowError::InvalidTransition {
            step: self.step,
            action: "set a password without a verified code",
        })?;

        let outcome = self
            .directory
            .mutate_credential(&identity, &code, new_password)
            .await?;

        if outcome.success {
            self.verification.consume(&identity).await;
            self.step = RecoveryStep::Done;
            info!("Recovery flow completed for {}", identity);
        }
        Ok(outcome)
    }

    /// Navigate one step backwards. A pure UI affordance: the server-side
    /// record is untouched.
    pub fn back(&mut self) -> Result<RecoveryStep, FlowError> {
        self.step = match self.step {
            RecoveryStep::VerifyOtp => RecoveryStep::AwaitOtp,
            RecoveryStep::SetPassword => RecoveryStep::VerifyOtp,
            step => {
                return Err(FlowError::InvalidTransition {
                    step,
                    action: "navigate back",
                })
            }
        };
        Ok(self.step)
    }

    fn require_identity(&self) -> Result<String, FlowError> {
        self.identity.clone().ok_or(FlowError::InvalidTransition {
            step: self.step,
            action: "continue without an identified account",
        })
    }
}

/// Test support: a scriptable credential directory.
pub mod testing {
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;

    use super::{AccountStatus, CredentialDirectory, MutationOutcome};
    use crate::service::verification::OtpVerificationService;
    use crate::utils::error::{AppError, AppResult};
    use std::sync::Arc;

    /// Directory backed by a fixed account table. When wired to a
    /// verification service it re-validates the submitted code on every
    /// mutation, mirroring the trust boundary of the real endpoint.
    pub struct MockDirectory {
        accounts: HashMap<String, AccountStatus>,
        verification: Option<Arc<OtpVerificationService>>,
        fail_mutation: Mutex<bool>,
        mutations: Mutex<Vec<(String, String)>>,
    }

    impl MockDirectory {
        pub fn new() -> Self {
            Self {
                accounts: HashMap::new(),
                verification: None,
                fail_mutation: Mutex::new(false),
                mutations: Mutex::new(Vec::new()),
            }
        }

        pub fn with_account(
            mut self,
            username: &str,
            email: &str,
            full_name: Option<&str>,
            needs_reset: bool,
        ) -> Self {
            let status = AccountStatus {
                needs_reset,
                email: email.to_string(),
                full_name: full_name.map(str::to_string),
            };
            self.accounts.insert(username.to_string(), status.clone());
            self.accounts.insert(email.to_string(), status);
            self
        }

        pub fn with_verification(mut self, verification: Arc<OtpVerificationService>) -> Self {
            self.verification = Some(verification);
            self
        }

        pub fn set_fail_mutation(&self, fail: bool) {
            *self
                .fail_mutation
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = fail;
        }

        /// Credential mutations applied so far, as (identity, password)
        pub fn mutations(&self) -> Vec<(String, String)> {
            self.mutations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Default for MockDirectory {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl CredentialDirectory for MockDirectory {
        async fn check_account_needs_reset(&self, identity: &str) -> AppResult<AccountStatus> {
            self.accounts
                .get(identity)
                .cloned()
                .ok_or_else(|| AppError::NotFound("account not found".to_string()))
        }

        async fn mutate_credential(
            &self,
            identity: &str,
            otp: &str,
            new_password: &str,
        ) -> AppResult<MutationOutcome> {
            if *self
                .fail_mutation
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
            {
                return Ok(MutationOutcome {
                    success: false,
                    message: "the directory rejected the new password".to_string(),
                });
            }

            if let Some(verification) = &self.verification {
                let receipt = verification.verify(identity, otp).await?;
                if !receipt.is_valid() {
                    return Ok(MutationOutcome {
                        success: false,
                        message: format!("code re-validation failed: {}", receipt.message),
                    });
                }
            }

            self.mutations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((identity.to_string(), new_password.to_string()));
            Ok(MutationOutcome {
                success: true,
                message: "password updated".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockDirectory;
    use super::*;
    use crate::config::OtpPolicy;
    use crate::service::email_service::testing::{MockMailer, MockMode};
    use crate::store::{InMemoryOtpStore, OtpStore};

    struct Harness {
        mailer: Arc<MockMailer>,
        directory: Arc<MockDirectory>,
        store: Arc<dyn OtpStore>,
        verification: Arc<OtpVerificationService>,
        issuance: Arc<OtpIssuanceService>,
    }

    fn harness() -> Harness {
        let policy = OtpPolicy {
            ttl_minutes: 10,
            max_attempts: 3,
            resend_interval_seconds: 0,
        };
        let store: Arc<dyn OtpStore> = Arc::new(InMemoryOtpStore::new());
        let mailer = Arc::new(MockMailer::new(MockMode::Accept));
        let issuance = Arc::new(OtpIssuanceService::new(
            store.clone(),
            Some(mailer.clone()),
            policy,
        ));
        let verification = Arc::new(OtpVerificationService::new(store.clone(), policy));
        let directory = Arc::new(
            MockDirectory::new()
                .with_account("asmith", "alice@example.com", Some("Alice Smith"), true)
                .with_account("bjones", "bob@example.com", None, false)
                .with_verification(verification.clone()),
        );
        Harness {
            mailer,
            directory,
            store,
            verification,
            issuance,
        }
    }

    fn flow(h: &Harness) -> RecoveryFlow {
        RecoveryFlow::new(
            h.issuance.clone(),
            h.verification.clone(),
            h.directory.clone(),
        )
    }

    fn self_service() -> IdentitySource {
        IdentitySource::SelfService {
            email: "alice@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_self_service_happy_path() {
        let h = harness();
        let mut flow = flow(&h);
        assert_eq!(flow.step(), RecoveryStep::IdentifyAccount);

        flow.identify(self_service()).await.unwrap();
        assert_eq!(flow.step(), RecoveryStep::AwaitOtp);
        assert!(flow.expires_at().unwrap() > Utc::now());

        let code = h.mailer.last_code().unwrap();
        let receipt = flow.submit_code(&code).await.unwrap();
        assert!(receipt.is_valid());
        assert_eq!(flow.step(), RecoveryStep::SetPassword);

        let outcome = flow.set_password("NewSecret9!").await.unwrap();
        assert!(outcome.success);
        assert_eq!(flow.step(), RecoveryStep::Done);

        assert_eq!(
            h.directory.mutations(),
            vec![("alice@example.com".to_string(), "NewSecret9!".to_string())]
        );

        // The record was invalidated on completion
        assert!(h.store.issued_at("alice@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_admin_reset_resolves_identity_from_username() {
        let h = harness();
        let mut flow = flow(&h);

        flow.identify(IdentitySource::AdminReset {
            username: "asmith".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(flow.identity(), Some("alice@example.com"));
        let sent = h.mailer.sent();
        assert_eq!(sent[0].to_email, "alice@example.com");
        assert_eq!(sent[0].display_name, "Alice Smith");

        // Same protocol from here on
        let code = h.mailer.last_code().unwrap();
        flow.submit_code(&code).await.unwrap();
        let outcome = flow.set_password("NewSecret9!").await.unwrap();
        assert!(outcome.success);
        assert_eq!(flow.step(), RecoveryStep::Done);
    }

    #[tokio::test]
    async fn test_admin_reset_requires_pending_reset() {
        let h = harness();
        let mut flow = flow(&h);

        let result = flow
            .identify(IdentitySource::AdminReset {
                username: "bjones".to_string(),
            })
            .await;
        assert!(matches!(result, Err(FlowError::AccountNotEligible)));
        assert_eq!(flow.step(), RecoveryStep::IdentifyAccount);
    }

    #[tokio::test]
    async fn test_wrong_code_returns_to_await_with_reason() {
        let h = harness();
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();

        let code = h.mailer.last_code().unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let receipt = flow.submit_code(wrong).await.unwrap();
        assert!(!receipt.is_valid());
        assert_eq!(receipt.message, "incorrect code");
        assert_eq!(flow.step(), RecoveryStep::AwaitOtp);

        // The flow is retryable, not a dead end
        let retry = flow.submit_code(&code).await.unwrap();
        assert!(retry.is_valid());
    }

    #[tokio::test]
    async fn test_malformed_code_keeps_flow_on_code_entry() {
        let h = harness();
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();

        let result = flow.submit_code("12").await;
        assert!(matches!(result, Err(FlowError::Service(_))));
        assert_eq!(flow.step(), RecoveryStep::AwaitOtp);

        let code = h.mailer.last_code().unwrap();
        let receipt = flow.submit_code(&code).await.unwrap();
        assert!(receipt.is_valid());
    }

    #[tokio::test]
    async fn test_resend_discards_previous_code() {
        let h = harness();
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();

        let original = h.mailer.last_code().unwrap();
        flow.resend().await.unwrap();
        assert_eq!(flow.step(), RecoveryStep::AwaitOtp);

        let fresh = h.mailer.last_code().unwrap();
        if original != fresh {
            let stale = flow.submit_code(&original).await.unwrap();
            assert!(!stale.is_valid());
        }

        let receipt = flow.submit_code(&fresh).await.unwrap();
        assert!(receipt.is_valid());
    }

    #[tokio::test]
    async fn test_password_policy_enforced_before_submission() {
        let h = harness();
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();
        let code = h.mailer.last_code().unwrap();
        flow.submit_code(&code).await.unwrap();

        for weak in ["short1!", "nouppercase1!", "NOLOWERCASE1!", "NoDigits!!", "NoSymbol11", "has space1A!"] {
            let result = flow.set_password(weak).await;
            assert!(matches!(result, Err(FlowError::PasswordPolicy(_))), "{weak}");
            assert_eq!(flow.step(), RecoveryStep::SetPassword);
        }

        // No mutation reached the directory
        assert!(h.directory.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_failure_keeps_flow_retryable() {
        let h = harness();
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();
        let code = h.mailer.last_code().unwrap();
        flow.submit_code(&code).await.unwrap();

        h.directory.set_fail_mutation(true);
        let outcome = flow.set_password("NewSecret9!").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(flow.step(), RecoveryStep::SetPassword);

        h.directory.set_fail_mutation(false);
        let retry = flow.set_password("NewSecret9!").await.unwrap();
        assert!(retry.success);
        assert_eq!(flow.step(), RecoveryStep::Done);
    }

    #[tokio::test]
    async fn test_back_navigation_is_pure() {
        let h = harness();
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();
        let code = h.mailer.last_code().unwrap();
        flow.submit_code(&code).await.unwrap();
        assert_eq!(flow.step(), RecoveryStep::SetPassword);

        assert_eq!(flow.back().unwrap(), RecoveryStep::VerifyOtp);
        assert_eq!(flow.back().unwrap(), RecoveryStep::AwaitOtp);

        // The server-side record survived the back navigation
        let receipt = flow.submit_code(&code).await.unwrap();
        assert!(receipt.is_valid());
    }

    #[tokio::test]
    async fn test_invalid_transitions_are_rejected() {
        let h = harness();
        let mut flow = flow(&h);

        // Cannot act before identifying the account
        assert!(matches!(
            flow.submit_code("123456").await,
            Err(FlowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            flow.set_password("NewSecret9!").await,
            Err(FlowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            flow.resend().await,
            Err(FlowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            flow.back(),
            Err(FlowError::InvalidTransition { .. })
        ));

        // Cannot identify twice
        flow.identify(self_service()).await.unwrap();
        assert!(matches!(
            flow.identify(self_service()).await,
            Err(FlowError::InvalidTransition { .. })
        ));

        // Done is terminal
        let code = h.mailer.last_code().unwrap();
        flow.submit_code(&code).await.unwrap();
        flow.set_password("NewSecret9!").await.unwrap();
        assert_eq!(flow.step(), RecoveryStep::Done);
        assert!(matches!(
            flow.submit_code(&code).await,
            Err(FlowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            flow.resend().await,
            Err(FlowError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_bypassing_verification_is_rejected_downstream() {
        let h = harness();

        // A client that skips the state machine and calls the mutation
        // endpoint directly with a guessed code is rejected server-side.
        let mut flow = flow(&h);
        flow.identify(self_service()).await.unwrap();

        let code = h.mailer.last_code().unwrap();
        let guessed = if code == "000000" { "000001" } else { "000000" };

        let outcome = h
            .directory
            .mutate_credential("alice@example.com", guessed, "NewSecret9!")
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(h.directory.mutations().is_empty());
    }
}
