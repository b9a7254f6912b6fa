//! HTTP Request Handlers
//!
//! Axum handlers for the recovery endpoints. Handlers validate payloads,
//! delegate to the services, and shape `{ status, message }` responses;
//! the generated code never appears in any response body.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use validator::Validate;

use crate::{
    models::requests::*,
    models::VerifyOutcome,
    service::{OtpIssuanceService, OtpVerificationService},
    utils::error::{AppError, AppResult},
    VERSION,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub issuance: Arc<OtpIssuanceService>,
    pub verification: Arc<OtpVerificationService>,
}

/// Issue a recovery code and dispatch it by email
pub async fn issue_recovery_code(
    State(state): State<AppState>,
    Json(request): Json<IssueCodeRequest>,
) -> AppResult<Json<IssueCodeResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let receipt = state
        .issuance
        .issue(&request.email, request.full_name.as_deref())
        .await?;

    Ok(Json(IssueCodeResponse {
        status: "success".to_string(),
        message: receipt.message,
        timestamp: receipt.timestamp,
        expires_in: receipt.expires_in,
    }))
}

/// Verify a submitted recovery code
pub async fn verify_recovery_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> AppResult<Json<VerifyCodeResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let receipt = state
        .verification
        .verify(&request.email, &request.otp_code)
        .await?;

    match receipt.outcome {
        VerifyOutcome::Valid => Ok(Json(VerifyCodeResponse {
            status: "success".to_string(),
            message: receipt.message.to_string(),
        })),
        VerifyOutcome::Mismatched | VerifyOutcome::Expired => {
            Err(AppError::Validation(receipt.message.to_string()))
        }
        VerifyOutcome::AttemptsExceeded => Err(AppError::RateLimit(receipt.message.to_string())),
        VerifyOutcome::NotFound => Err(AppError::NotFound(receipt.message.to_string())),
    }
}

/// Health check endpoint
pub async fn health_check() -> AppResult<Json<HealthCheckResponse>> {
    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    }))
}
