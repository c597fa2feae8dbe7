//! Email-verification business logic.
//!
//! Issues single-use mailbox-ownership tokens and consumes them exactly
//! once, flipping `email_verified` on the user record.

use crate::config::Config;
use crate::database::models::{EmailVerification, User};
use crate::errors::{AuthError, AuthResult, VerificationError};
use crate::repositories::user_repository::UserRepository;
use crate::repositories::verification_repository::VerificationRepository;
use crate::services::email_service::EmailService;
use crate::utils::token::{VERIFICATION_TOKEN_LENGTH, generate_token};
use chrono::{Duration, Utc};
use std::sync::Arc;

pub struct VerificationService {
    repo: VerificationRepository,
    users: Arc<dyn UserRepository>,
    /// Best-effort mailer; when absent the token is only logged.
    email_service: Option<EmailService>,
    token_ttl: Duration,
}

impl VerificationService {
    pub fn new(
        repo: VerificationRepository,
        users: Arc<dyn UserRepository>,
        email_service: Option<EmailService>,
        config: &Config,
    ) -> Self {
        Self {
            repo,
            users,
            email_service,
            token_ttl: Duration::hours(config.verification_token_ttl_hours as i64),
        }
    }

    /// Issues a fresh verification token for the user, superseding any
    /// pending one.
    pub async fn issue(&self, user_id: &str) -> AuthResult<EmailVerification> {
        let now = Utc::now();
        let verification = EmailVerification {
            token: generate_token(VERIFICATION_TOKEN_LENGTH),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + self.token_ttl,
            consumed_at: None,
        };

        self.repo.invalidate_pending_for_user(user_id).await?;
        self.repo.insert(&verification).await?;

        Ok(verification)
    }

    /// Consumes a verification token and marks the owning user's email as
    /// verified. Each token yields success exactly once.
    pub async fn consume(&self, token: &str) -> AuthResult<String> {
        let verification = self
            .repo
            .find_by_token(token)
            .await?
            .ok_or(VerificationError::NotFound)?;

        if verification.consumed_at.is_some() {
            return Err(VerificationError::AlreadyConsumed.into());
        }
        if verification.expires_at <= Utc::now() {
            return Err(VerificationError::Expired.into());
        }

        // The conditional update is the single winner selection; a racing
        // consume of the same token loses here.
        if !self.repo.mark_consumed(token).await? {
            return Err(VerificationError::AlreadyConsumed.into());
        }

        let mut user = self
            .users
            .find_by_id(&verification.user_id)
            .await?
            .ok_or_else(|| AuthError::user_not_found(&verification.user_id))?;

        user.email_verified = true;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;

        tracing::info!("email verified for user {}", user.id);
        Ok(user.id)
    }

    /// Re-issues a verification token for the given email address.
    pub async fn resend(&self, email: &str) -> AuthResult<EmailVerification> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::user_not_found(email))?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let verification = self.issue(&user.id).await?;
        self.try_send_verification_email(&user, &verification.token)
            .await;

        Ok(verification)
    }

    /// Attempts to send the verification email, logging but not failing the
    /// request when the email service is unavailable.
    pub async fn try_send_verification_email(&self, user: &User, token: &str) {
        if let Some(ref email_service) = self.email_service {
            match email_service
                .send_verification_email(&user.email, &user.username, token)
                .await
            {
                Ok(_) => {
                    tracing::info!("verification email sent to {}", user.email);
                }
                Err(e) => {
                    tracing::error!("failed to send verification email to {}: {}", user.email, e);
                }
            }
        } else {
            tracing::warn!(
                "email service not configured; verification token for {} was not emailed",
                user.email
            );
        }
    }
}
