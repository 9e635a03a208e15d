// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::quota::QuotaKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Profile has not been created")]
    ProfileRequired,

    #[error("Your account is pending verification. Please wait for admin approval.")]
    VerificationPending,

    #[error("Your account has been blocked. Please contact support.")]
    AccountBlocked,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Daily {kind} quota exceeded ({used}/{limit})")]
    QuotaExceeded {
        kind: QuotaKind,
        used: u32,
        limit: u32,
    },

    #[error("Rate limit exceeded. Please try again in a moment.")]
    AiRateLimited,

    #[error("AI credits depleted. Please add credits to continue.")]
    AiCreditsDepleted,

    #[error("AI gateway error: {0}")]
    AiGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Maintenance: {0}")]
    Maintenance(String),

    #[error("PDF rendering error: {0}")]
    Pdf(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code the frontend switches on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::ProfileRequired => "profile_required",
            AppError::VerificationPending => "verification_pending",
            AppError::AccountBlocked => "account_blocked",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
            AppError::UnsupportedMediaType(_) => "unsupported_media_type",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::QuotaExceeded { .. } => "quota_exceeded",
            AppError::AiRateLimited => "rate_limited",
            AppError::AiCreditsDepleted => "credits_depleted",
            AppError::AiGateway(_) => "ai_gateway_error",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Maintenance(_) => "maintenance",
            AppError::Pdf(_) => "pdf_error",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::ProfileRequired
            | AppError::VerificationPending
            | AppError::AccountBlocked
            | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::QuotaExceeded { .. } | AppError::AiRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::AiCreditsDepleted => StatusCode::PAYMENT_REQUIRED,
            AppError::AiGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) | AppError::Maintenance(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Pdf(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::Unauthorized | AppError::InvalidToken | AppError::ProfileRequired => None,
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Pdf(msg) => {
                tracing::error!(error = %msg, "PDF rendering error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::AiGateway(msg) => Some(msg.clone()),
            AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::ServiceUnavailable(msg)
            | AppError::Maintenance(msg) => Some(msg.clone()),
            other => Some(other.to_string()),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
