//! Data structures for authentication-related entities.
//!
//! This module defines request and response payloads for the auth endpoints
//! and the typed identity value the authorization gate attaches to requests.

use crate::database::models::{RefreshSession, Role, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identity established by the authorization gate and threaded through the
/// request as a typed extension value.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: String,
    pub role: Role,
}

/// Registration request payload
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Username must be between 1-255 characters"
    ))]
    pub username: String,

    pub profile: Option<ProfileInput>,
}

/// Optional profile details supplied at registration
#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response containing the token pair and user info
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token expiration in seconds
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Token refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Token refresh response
#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Logout request; the token is optional so logout stays idempotent even
/// for clients that already dropped it.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Query parameters of the email-verification link
#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

/// Resend-verification request payload
#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
}

/// Resend-verification response carrying the fresh token
#[derive(Debug, Serialize)]
pub struct ResendVerificationResponse {
    pub message: String,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sanitized user information returned by the API; never carries the
/// password hash.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            email_verified: user.email_verified,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
        }
    }
}

/// An active refresh session as shown to administrators. The raw token is
/// deliberately omitted.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<RefreshSession> for SessionInfo {
    fn from(session: RefreshSession) -> Self {
        SessionInfo {
            user_id: session.user_id,
            issued_at: session.issued_at,
            expires_at: session.expires_at,
        }
    }
}
