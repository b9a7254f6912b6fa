//! Request and Response Models
//!
//! Data structures for API request and response payloads with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for issuing a recovery code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IssueCodeRequest {
    /// Email address the code should be bound to and sent to
    #[validate(custom(function = "crate::utils::validation::email_validator"))]
    pub email: String,

    /// Optional display name used in the recovery email greeting
    #[validate(length(max = 255, message = "Name is too long"))]
    pub full_name: Option<String>,
}

/// Request payload for verifying a submitted recovery code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    /// Email address the code was issued for
    #[validate(custom(function = "crate::utils::validation::email_validator"))]
    pub email: String,

    /// 6-digit code received via email
    #[validate(length(min = 6, max = 6, message = "Code must be exactly 6 digits"))]
    #[validate(custom(function = "crate::utils::validation::otp_code_validator"))]
    pub otp_code: String,
}

/// Response for a successful issuance request
///
/// The generated code is never part of this payload; it travels only
/// through the email gateway.
#[derive(Debug, Serialize)]
pub struct IssueCodeResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Validity window in seconds, for the client countdown display
    pub expires_in: i64,
}

/// Response for a verification request
#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub status: String,
    pub message: String,
}

/// Response for health check
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_code_request_validation() {
        let request = IssueCodeRequest {
            email: "alice@example.com".to_string(),
            full_name: Some("Alice Smith".to_string()),
        };
        assert!(request.validate().is_ok());

        let invalid = IssueCodeRequest {
            email: "not-an-email".to_string(),
            full_name: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_verify_code_request_validation() {
        let request = VerifyCodeRequest {
            email: "alice@example.com".to_string(),
            otp_code: "123456".to_string(),
        };
        assert!(request.validate().is_ok());

        let too_short = VerifyCodeRequest {
            email: "alice@example.com".to_string(),
            otp_code: "12345".to_string(),
        };
        assert!(too_short.validate().is_err());

        let non_numeric = VerifyCodeRequest {
            email: "alice@example.com".to_string(),
            otp_code: "12345a".to_string(),
        };
        assert!(non_numeric.validate().is_err());
    }
}
