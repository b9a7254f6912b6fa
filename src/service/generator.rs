//! OTP Generator
//!
//! Produces fixed-length numeric recovery codes from the operating
//! system's entropy source. A failure to obtain entropy aborts issuance.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::utils::error::{AppError, AppResult};

/// Number of digits in a generated code
pub const CODE_LENGTH: u32 = 6;

const CODE_SPACE: u32 = 10u32.pow(CODE_LENGTH);
// Largest multiple of the code space that fits in a u32; draws at or
// above it are rejected to keep every code equally likely.
const REJECTION_BOUND: u32 = (u32::MAX / CODE_SPACE) * CODE_SPACE;

/// Generator for 6-digit decimal recovery codes
#[derive(Debug, Clone, Default)]
pub struct OtpGenerator;

impl OtpGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a zero-padded 6-digit code with uniformly distributed
    /// digits.
    pub fn generate(&self) -> AppResult<String> {
        let mut buf = [0u8; 4];
        loop {
            OsRng
                .try_fill_bytes(&mut buf)
                .map_err(|e| AppError::Internal(format!("entropy source failed: {}", e)))?;
            let draw = u32::from_le_bytes(buf);
            if draw < REJECTION_BOUND {
                return Ok(format!("{:06}", draw % CODE_SPACE));
            }
        }
    }
}
