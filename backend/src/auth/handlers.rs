//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for registration, email
//! verification, login, token refresh, and session revocation, and delegate
//! the business logic to `auth::service`.

use crate::api::common::{ApiResponse, auth_error_to_http};
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::errors::AuthError;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::Json as ResponseJson,
};
use std::sync::Arc;

/// Handle user registration request
#[axum::debug_handler]
pub async fn register(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<UserInfo>), (StatusCode, String)> {
    match auth_service.register(payload).await {
        Ok(user) => Ok((StatusCode::CREATED, ResponseJson(user))),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Handle the email-verification link
#[axum::debug_handler]
pub async fn verify_email(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    let token = match query.token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => {
            return Err(auth_error_to_http(AuthError::missing_field(
                "token query parameter is required",
            )));
        }
    };

    match auth_service.verify_email(token).await {
        Ok(_) => Ok(ResponseJson(ApiResponse::<()>::message(
            "Email verified successfully",
        ))),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Handle re-issuing of a verification token
#[axum::debug_handler]
pub async fn resend_verification(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<ResponseJson<ResendVerificationResponse>, (StatusCode, String)> {
    match auth_service.resend_verification(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<LoginResponse>, (StatusCode, String)> {
    match auth_service.login(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Handle token refresh request
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<ResponseJson<RefreshTokenResponse>, (StatusCode, String)> {
    match auth_service.refresh_token(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Handle logout request; always confirms revocation.
#[axum::debug_handler]
pub async fn logout(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(payload): Json<LogoutRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    match auth_service.logout(payload).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Revoke every session of the authenticated user
#[axum::debug_handler]
pub async fn logout_all(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<StatusCode, (StatusCode, String)> {
    match auth_service.logout_all(&identity.user_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Get current user information from the authenticated identity
#[axum::debug_handler]
pub async fn me(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<ResponseJson<UserInfo>, (StatusCode, String)> {
    match auth_service.current_user(&identity.user_id).await {
        Ok(user) => Ok(ResponseJson(user)),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// List active refresh sessions (admin only)
#[axum::debug_handler]
pub async fn list_sessions(
    Extension(auth_service): Extension<Arc<AuthService>>,
) -> Result<ResponseJson<Vec<SessionInfo>>, (StatusCode, String)> {
    match auth_service.active_sessions().await {
        Ok(sessions) => Ok(ResponseJson(sessions)),
        Err(error) => Err(auth_error_to_http(error)),
    }
}

/// Force-revoke every session of a user (admin only)
#[axum::debug_handler]
pub async fn revoke_user_sessions(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    match auth_service.revoke_user_sessions(&user_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(error) => Err(auth_error_to_http(error)),
    }
}
