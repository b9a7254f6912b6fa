//! Configuration Module
//!
//! Centralized configuration management for the recovery service:
//! server binding, email gateway credentials, and the OTP policy.

use anyhow::bail;

/// Environment variable helpers
pub mod env {
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable as boolean with default
    pub fn get_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i32 with default
    pub fn get_i32(key: &str, default: i32) -> i32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Check if environment variable is set
    pub fn is_set(key: &str) -> bool {
        env::var(key).is_ok()
    }

    /// Get required environment variable or panic
    pub fn get_required(key: &str) -> String {
        env::var(key).unwrap_or_else(|_| panic!("Required environment variable {} is not set", key))
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Email gateway configuration; absent credentials make issuance
    /// fail per-request rather than preventing startup
    pub email: Option<EmailConfig>,

    /// OTP policy shared by issuance and verification
    pub otp: OtpPolicy,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Email gateway configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_use_tls: bool,
    pub from_name: String,
    pub from_email: String,
}

/// The single server-side OTP policy.
///
/// TTL and attempt cap are owned here and nowhere else; callers receive
/// them through the services rather than hardcoding their own copies.
#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    /// Validity window in minutes from issuance
    pub ttl_minutes: i64,
    /// Failed verification attempts before the record is invalidated
    pub max_attempts: i32,
    /// Minimum seconds between issuances for one identity; 0 disables
    pub resend_interval_seconds: i64,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl_minutes: 10,
            max_attempts: 3,
            resend_interval_seconds: 60,
        }
    }
}

impl OtpPolicy {
    pub fn from_env() -> Self {
        Self {
            ttl_minutes: env::get_i64("OTP_TTL_MINUTES", 10),
            max_attempts: env::get_i32("OTP_MAX_ATTEMPTS", 3),
            resend_interval_seconds: env::get_i64("OTP_RESEND_INTERVAL_SECONDS", 60),
        }
    }

    /// Validity window as a duration
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes)
    }

    /// Validity window in seconds, for client countdown displays
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_minutes * 60
    }

    /// Minimum interval between issuances as a duration
    pub fn resend_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.resend_interval_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_u16("SERVER_PORT", 3000),
            log_level: env::get_string("LOG_LEVEL", "info"),
        }
    }
}

impl EmailConfig {
    pub fn from_env() -> Option<Self> {
        if !env::is_set("SMTP_HOST") {
            return None;
        }

        Some(Self {
            smtp_host: env::get_required("SMTP_HOST"),
            smtp_port: env::get_u16("SMTP_PORT", 587),
            smtp_username: env::get_required("SMTP_USERNAME"),
            smtp_password: env::get_required("SMTP_PASSWORD"),
            smtp_use_tls: env::get_bool("SMTP_USE_TLS", true),
            from_name: env::get_string("SMTP_FROM_NAME", "Recovery Service"),
            from_email: env::get_required("SMTP_FROM_EMAIL"),
        })
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            email: EmailConfig::from_env(),
            otp: OtpPolicy::from_env(),
        })
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.otp.ttl_minutes <= 0 {
            bail!("OTP TTL must be greater than 0");
        }

        if self.otp.max_attempts <= 0 {
            bail!("OTP max attempts must be greater than 0");
        }

        if self.otp.resend_interval_seconds < 0 {
            bail!("OTP resend interval cannot be negative");
        }

        if self.otp.resend_interval_seconds >= self.otp.ttl_minutes * 60 {
            bail!("OTP resend interval must be shorter than the TTL");
        }

        Ok(())
    }
}
