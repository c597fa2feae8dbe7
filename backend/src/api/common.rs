//! Error handling utilities for API responses.
//!
//! Provides the standard response envelope and the conversion between the
//! domain `AuthError` taxonomy and HTTP responses.
//!
//! # Response Format
//! All errors return consistent JSON responses containing:
//! - `message`: Human-readable message
//! - `error.error_type`: Machine-readable error category
//!
//! Internal failures are logged server-side and answered with a generic
//! body; signing keys and token contents never appear in a response.

use crate::errors::{AuthError, VerificationError};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Request timestamp
    pub timestamp: String,
}

/// Error details for failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful message-only response
    pub fn message(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: true,
            data: None,
            message: message.into(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response
    pub fn error(message: impl Into<String>, error_type: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts an AuthError to the appropriate HTTP response with the standard
/// envelope.
pub fn auth_error_to_http(error: AuthError) -> (StatusCode, String) {
    let (status, error_type, message) = match error {
        AuthError::MissingField { message } => {
            (StatusCode::BAD_REQUEST, "missing_field", message)
        }
        AuthError::AlreadyExists { entity, identifier } => (
            StatusCode::CONFLICT,
            "already_exists",
            format!("{} '{}' already exists", entity, identifier),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid credentials".to_string(),
        ),
        AuthError::MissingToken => (
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "Authentication token is required".to_string(),
        ),
        AuthError::TokenInvalidOrExpired => (
            StatusCode::FORBIDDEN,
            "token_invalid_or_expired",
            "Token is invalid or expired".to_string(),
        ),
        AuthError::TokenNotRecognized => (
            StatusCode::FORBIDDEN,
            "token_not_recognized",
            "Refresh token not recognized".to_string(),
        ),
        AuthError::RoleMismatch => (
            StatusCode::FORBIDDEN,
            "role_mismatch",
            "Insufficient role for this resource".to_string(),
        ),
        AuthError::UserNotFound { identifier } => (
            StatusCode::NOT_FOUND,
            "user_not_found",
            format!("User '{}' not found", identifier),
        ),
        AuthError::AlreadyVerified => (
            StatusCode::BAD_REQUEST,
            "already_verified",
            "Email is already verified".to_string(),
        ),
        AuthError::Verification(VerificationError::NotFound) => (
            StatusCode::BAD_REQUEST,
            "invalid_verification_token",
            "Invalid verification token".to_string(),
        ),
        AuthError::Verification(VerificationError::Expired) => (
            StatusCode::BAD_REQUEST,
            "verification_token_expired",
            "Verification token has expired".to_string(),
        ),
        AuthError::Verification(VerificationError::AlreadyConsumed) => (
            StatusCode::BAD_REQUEST,
            "token_already_consumed",
            "Verification token has already been used".to_string(),
        ),
        AuthError::Internal { source } => {
            tracing::error!("internal error: {}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            )
        }
    };

    let error_response = ApiResponse::<()>::error(message, error_type);
    (status, serde_json::to_string(&error_response).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn taxonomy_maps_onto_the_documented_status_codes() {
        let cases = [
            (AuthError::missing_field("email"), StatusCode::BAD_REQUEST),
            (
                AuthError::already_exists("User", "a@example.com"),
                StatusCode::CONFLICT,
            ),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::MissingToken, StatusCode::UNAUTHORIZED),
            (AuthError::TokenInvalidOrExpired, StatusCode::FORBIDDEN),
            (AuthError::TokenNotRecognized, StatusCode::FORBIDDEN),
            (AuthError::RoleMismatch, StatusCode::FORBIDDEN),
            (AuthError::user_not_found("u1"), StatusCode::NOT_FOUND),
            (AuthError::AlreadyVerified, StatusCode::BAD_REQUEST),
            (
                AuthError::Verification(VerificationError::NotFound),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::Verification(VerificationError::AlreadyConsumed),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            let (status, _body) = auth_error_to_http(error);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn internal_errors_never_leak_their_cause() {
        let (status, body) = auth_error_to_http(AuthError::Internal {
            source: anyhow!("secret key material: hunter2"),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("hunter2"));
        assert!(body.contains("internal_error"));
    }
}
