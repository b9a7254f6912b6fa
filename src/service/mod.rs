//! Service Layer
//!
//! Business logic of the recovery protocol: code generation, issuance,
//! verification, email dispatch, and the client-facing flow controller.

pub mod email_service;
pub mod generator;
pub mod issuance;
pub mod recovery_flow;
pub mod verification;

// Re-export services
pub use email_service::{RecoveryMailer, SmtpMailer};
pub use generator::OtpGenerator;
pub use issuance::{IssueReceipt, OtpIssuanceService};
pub use recovery_flow::{
    AccountStatus, CredentialDirectory, FlowError, IdentitySource, MutationOutcome, RecoveryFlow,
    RecoveryStep,
};
pub use verification::{OtpVerificationService, VerifyReceipt};
