//! Recovery Service Library
//!
//! A password-recovery service built around a one-time-password (OTP)
//! protocol: codes are issued to an identity, delivered by email,
//! verified under a time-to-live and attempt cap, and consumed once a
//! downstream credential mutation completes.
//!
//! # Features
//!
//! - **OTP protocol core**: keyed, expiring, attempt-limited store with
//!   per-identity serialization of concurrent requests
//! - **Issuance and verification services**: one configurable policy
//!   (TTL, attempt cap, resend interval) owned server-side
//! - **Recovery flow controller**: one state machine driving both the
//!   self-service and administrator-forced reset entry points
//! - **Email dispatch**: SMTP gateway behind a trait seam with HTML and
//!   plain-text templates
//! - **HTTP API**: axum endpoints with configurable routing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use recovery_service::{
//!     api::{AppState, RouterBuilder},
//!     config::OtpPolicy,
//!     service::{OtpIssuanceService, OtpVerificationService},
//!     store::{InMemoryOtpStore, OtpStore},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = OtpPolicy::default();
//!     let store: Arc<dyn OtpStore> = Arc::new(InMemoryOtpStore::new());
//!
//!     let app_state = AppState {
//!         issuance: Arc::new(OtpIssuanceService::new(store.clone(), None, policy)),
//!         verification: Arc::new(OtpVerificationService::new(store, policy)),
//!     };
//!
//!     let app = RouterBuilder::with_all_routes()
//!         .build()
//!         .with_state(app_state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: HTTP handlers and configurable route definitions
//! - **Service Layer**: generation, issuance, verification, dispatch,
//!   and the recovery flow state machine
//! - **Store**: the authoritative record of pending codes, behind the
//!   [`store::OtpStore`] trait
//! - **Models**: OTP records, outcomes, and request/response payloads
//! - **Config**: environment-driven server, gateway, and policy settings
//!
//! # Security
//!
//! - Codes come from the OS entropy source, uniformly distributed
//! - Code values are never logged and never returned to HTTP callers
//! - Expiry and attempt limits are enforced by the store, not the client
//! - The final credential mutation re-validates the code server-side;
//!   the client-visible verified state is advisory only

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Configuration management for all service settings
pub mod config;

/// Data models and request/response structures
pub mod models;

/// Business logic: generation, issuance, verification, flow control
pub mod service;

/// Pending-code storage behind a swappable trait
pub mod store;

/// Shared utilities for validation and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_routes, AppState, RouterBuilder};
pub use config::{AppConfig, EmailConfig, OtpPolicy, ServerConfig};
pub use models::{
    requests::{IssueCodeRequest, VerifyCodeRequest},
    OtpRecord, VerifyOutcome,
};
pub use service::{
    CredentialDirectory, IdentitySource, OtpIssuanceService, OtpVerificationService, RecoveryFlow,
    RecoveryMailer, RecoveryStep, SmtpMailer,
};
pub use store::{InMemoryOtpStore, OtpStore};
pub use utils::error::{AppError, AppResult, ErrorResponse};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
