//! Global application error types and handlers.
//!
//! This module defines the error taxonomy used across the backend: token
//! codec failures, email-verification failures, and the request-facing
//! `AuthError` that the HTTP layer maps onto status codes.

use thiserror::Error;

/// Why a signed token failed verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be decoded at all.
    #[error("token is malformed")]
    Malformed,
    /// The signature did not match the expected key class.
    #[error("token signature is invalid")]
    InvalidSignature,
    /// The token decoded and verified but is past its expiry.
    #[error("token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Why an email-verification token could not be consumed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("verification token not found")]
    NotFound,
    #[error("verification token has expired")]
    Expired,
    #[error("verification token has already been consumed")]
    AlreadyConsumed,
}

/// Request-facing error for the authentication subsystem.
///
/// Every variant short-circuits the request; no token is issued and no
/// store mutation happens on a failed path.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or invalid field: {message}")]
    MissingField { message: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing authentication token")]
    MissingToken,

    #[error("token is invalid or expired")]
    TokenInvalidOrExpired,

    #[error("refresh token not recognized")]
    TokenNotRecognized,

    #[error("insufficient role for this resource")]
    RoleMismatch,

    #[error("user not found: {identifier}")]
    UserNotFound { identifier: String },

    #[error("email is already verified")]
    AlreadyVerified,

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: anyhow::Error,
    },
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::TokenInvalidOrExpired
    }
}

impl AuthError {
    // Helper constructors for common patterns

    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::MissingField {
            message: message.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn user_not_found(identifier: impl Into<String>) -> Self {
        Self::UserNotFound {
            identifier: identifier.into(),
        }
    }
}
