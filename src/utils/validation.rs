//! Validation Utilities
//!
//! Input validation for identities, submitted codes, and candidate
//! passwords. Everything here runs before a request is allowed to touch
//! the OTP store.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates email address format using a comprehensive regex pattern
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email)
}

/// Normalizes an identity to lowercase and removes surrounding whitespace
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Validates that an identity is a syntactically plausible email address
/// or username. Usernames are alphanumeric with dots, hyphens, and
/// underscores, 3-64 characters.
pub fn validate_identity(identity: &str) -> bool {
    if identity.contains('@') {
        return validate_email(identity);
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]{2,63}$").expect("Failed to compile username regex")
    });

    regex.is_match(identity)
}

/// Validates that a submitted code is exactly six decimal digits
pub fn validate_code_format(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Validates a candidate password against the recovery policy: at least
/// 8 characters, one uppercase, one lowercase, one digit, one symbol,
/// and no whitespace anywhere.
pub fn validate_password_policy(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::new(
            "Password must be at least 8 characters long",
        ));
    }

    if password.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::new("Password must not contain whitespace"));
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::new(
            "Password must contain at least one lowercase letter",
        ));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::new(
            "Password must contain at least one uppercase letter",
        ));
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err(ValidationError::new(
            "Password must contain at least one digit",
        ));
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(ValidationError::new(
            "Password must contain at least one symbol",
        ));
    }

    Ok(())
}

/// Custom validator for email fields using the validator crate
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email"))
    }
}

/// Custom validator for submitted OTP code fields
pub fn otp_code_validator(code: &str) -> Result<(), ValidationError> {
    if validate_code_format(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_otp_code"))
    }
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";
    pub const INVALID_IDENTITY: &str = "Please enter a valid email address or username";
    pub const INVALID_CODE: &str = "The code must be exactly 6 digits";
    pub const FIELD_REQUIRED: &str = "This field is required";
}
