//! Core business logic for the authentication system.
//!
//! Implements the login/refresh/logout protocol on top of the injected
//! collaborators: user repository, password hasher, refresh-session store,
//! token codec, and the email-verification flow.

use crate::auth::models::*;
use crate::auth::password::PasswordHasher;
use crate::database::models::{RefreshSession, Role, User};
use crate::errors::{AuthError, AuthResult};
use crate::repositories::session_repository::RefreshSessionStore;
use crate::repositories::user_repository::UserRepository;
use crate::services::verification_service::VerificationService;
use crate::utils::jwt::JwtUtils;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Authentication service handling registration, login, token refresh, and
/// session revocation.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: Arc<dyn RefreshSessionStore>,
    jwt: Arc<JwtUtils>,
    verification: VerificationService,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: Arc<dyn RefreshSessionStore>,
        jwt: Arc<JwtUtils>,
        verification: VerificationService,
    ) -> Self {
        Self {
            users,
            hasher,
            sessions,
            jwt,
            verification,
        }
    }

    /// Creates a user record and issues an email-verification token.
    /// Registration never issues authentication tokens.
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<UserInfo> {
        if let Err(validation_errors) = request.validate() {
            return Err(AuthError::missing_field(validation_message(
                validation_errors,
            )));
        }

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::already_exists("User with email", &request.email));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let profile = request.profile.unwrap_or_default();
        let now = Utc::now();

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: request.username,
            email: request.email,
            password_hash,
            role: Role::User,
            email_verified: false,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            created_at: now,
            updated_at: now,
        };

        self.users.save(&user).await?;

        let verification = self.verification.issue(&user.id).await?;
        self.verification
            .try_send_verification_email(&user, &verification.token)
            .await;

        tracing::info!("registered user {}", user.id);
        Ok(UserInfo::from(&user))
    }

    /// Authenticates credentials and mints an access/refresh pair. The
    /// refresh token is registered in the session store before it is
    /// handed out.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(AuthError::missing_field(validation_message(
                validation_errors,
            )));
        }

        // Unknown email and wrong password are indistinguishable to the caller.
        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(&request.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let access = self.jwt.issue_access_token(&user.id, user.role)?;
        let refresh = self.jwt.issue_refresh_token(&user.id)?;

        self.sessions
            .register(RefreshSession {
                token: refresh.token.clone(),
                user_id: user.id.clone(),
                issued_at: refresh.issued_at,
                expires_at: refresh.expires_at,
                revoked: false,
            })
            .await?;

        tracing::info!("user {} logged in", user.id);
        Ok(LoginResponse {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.jwt.access_ttl_seconds(),
            user: UserInfo::from(&user),
        })
    }

    /// Exchanges a live refresh token for a new access token. The token must
    /// be active in the store and pass codec verification; it is not rotated.
    pub async fn refresh_token(
        &self,
        request: RefreshTokenRequest,
    ) -> AuthResult<RefreshTokenResponse> {
        let token = match request.refresh_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::MissingToken),
        };

        if !self.sessions.is_active(token).await? {
            return Err(AuthError::TokenNotRecognized);
        }

        let claims = self.jwt.verify_refresh_token(token)?;

        // Role is read back from the record so a promotion or demotion takes
        // effect on the next refresh.
        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::user_not_found(&claims.sub))?;

        let access = self.jwt.issue_access_token(&user.id, user.role)?;

        Ok(RefreshTokenResponse {
            access_token: access.token,
            expires_in: self.jwt.access_ttl_seconds(),
        })
    }

    /// Revokes the presented refresh token. Succeeds whether or not the
    /// token was still valid.
    pub async fn logout(&self, request: LogoutRequest) -> AuthResult<()> {
        if let Some(token) = request
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
        {
            self.sessions.revoke(token).await?;
        }
        Ok(())
    }

    /// Revokes every refresh session owned by the user.
    pub async fn logout_all(&self, user_id: &str) -> AuthResult<()> {
        self.sessions.revoke_all(user_id).await?;
        tracing::info!("revoked all sessions for user {}", user_id);
        Ok(())
    }

    /// Consumes an email-verification token.
    pub async fn verify_email(&self, token: &str) -> AuthResult<String> {
        self.verification.consume(token).await
    }

    /// Re-issues a verification token for an unverified account.
    pub async fn resend_verification(
        &self,
        request: ResendVerificationRequest,
    ) -> AuthResult<ResendVerificationResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(AuthError::missing_field(validation_message(
                validation_errors,
            )));
        }

        let verification = self.verification.resend(&request.email).await?;

        Ok(ResendVerificationResponse {
            message: "Verification token re-issued".to_string(),
            verification_token: verification.token,
            expires_at: verification.expires_at,
        })
    }

    /// Loads the sanitized record of the authenticated user.
    pub async fn current_user(&self, user_id: &str) -> AuthResult<UserInfo> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::user_not_found(user_id))?;

        Ok(UserInfo::from(&user))
    }

    /// Lists active refresh sessions for operators.
    pub async fn active_sessions(&self) -> AuthResult<Vec<SessionInfo>> {
        let sessions = self.sessions.active_sessions().await?;
        Ok(sessions.into_iter().map(SessionInfo::from).collect())
    }

    /// Force-revokes every session of the given user.
    pub async fn revoke_user_sessions(&self, user_id: &str) -> AuthResult<()> {
        self.sessions.revoke_all(user_id).await?;
        Ok(())
    }
}

/// Flattens validator errors into a single message, field by field.
fn validation_message(validation_errors: validator::ValidationErrors) -> String {
    validation_errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::BcryptPasswordHasher;
    use crate::config::Config;
    use crate::repositories::session_repository::SqliteSessionStore;
    use crate::repositories::user_repository::SqliteUserRepository;
    use crate::repositories::verification_repository::VerificationRepository;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            server_port: 0,
            base_url: "http://localhost:3000".to_string(),
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_days: 7,
            verification_token_ttl_hours: 24,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            email_from_name: "Tidepool".to_string(),
            email_from_address: None,
        }
    }

    async fn test_service() -> (AuthService, SqlitePool) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();

        let config = test_config();
        let users: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::new(4));
        let sessions: Arc<dyn RefreshSessionStore> =
            Arc::new(SqliteSessionStore::new(pool.clone()));
        let jwt = Arc::new(JwtUtils::new(&config));
        let verification = VerificationService::new(
            VerificationRepository::new(pool.clone()),
            users.clone(),
            None,
            &config,
        );

        (
            AuthService::new(users, hasher, sessions, jwt, verification),
            pool,
        )
    }

    fn register_request(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "swordfish-supreme".to_string(),
            username: username.to_string(),
            profile: None,
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_and_duplicates() {
        let (service, _pool) = test_service().await;

        let err = service
            .register(register_request("not-an-email", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField { .. }));

        service
            .register(register_request("alice@example.com", "alice"))
            .await
            .unwrap();
        let err = service
            .register(register_request("alice@example.com", "alice2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn register_returns_sanitized_user_with_default_role() {
        let (service, _pool) = test_service().await;

        let user = service
            .register(register_request("bob@example.com", "bob"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(!user.email_verified);
        assert!(serde_json::to_string(&user).unwrap().contains("bob@example.com"));
        assert!(!serde_json::to_string(&user).unwrap().contains("password"));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_without_issuing_tokens() {
        let (service, _pool) = test_service().await;
        service
            .register(register_request("carol@example.com", "carol"))
            .await
            .unwrap();

        let err = service
            .login(login_request("carol@example.com", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = service
            .login(login_request("nobody@example.com", "swordfish-supreme"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // No session was registered on either failed path.
        assert!(service.active_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_refresh_logout_lifecycle() {
        let (service, _pool) = test_service().await;
        service
            .register(register_request("dave@example.com", "dave"))
            .await
            .unwrap();

        let login = service
            .login(login_request("dave@example.com", "swordfish-supreme"))
            .await
            .unwrap();

        // The refresh token works while the session is live.
        let refreshed = service
            .refresh_token(RefreshTokenRequest {
                refresh_token: Some(login.refresh_token.clone()),
            })
            .await
            .unwrap();
        assert!(!refreshed.access_token.is_empty());

        service
            .logout(LogoutRequest {
                refresh_token: Some(login.refresh_token.clone()),
            })
            .await
            .unwrap();

        // After logout, the same refresh token is refused by the store.
        let err = service
            .refresh_token(RefreshTokenRequest {
                refresh_token: Some(login.refresh_token.clone()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenNotRecognized));

        // Logout stays idempotent.
        service
            .logout(LogoutRequest {
                refresh_token: Some(login.refresh_token),
            })
            .await
            .unwrap();
        service
            .logout(LogoutRequest {
                refresh_token: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_requires_a_token_the_store_recognizes() {
        let (service, _pool) = test_service().await;

        let err = service
            .refresh_token(RefreshTokenRequest {
                refresh_token: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));

        let err = service
            .refresh_token(RefreshTokenRequest {
                refresh_token: Some("".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));

        let err = service
            .refresh_token(RefreshTokenRequest {
                refresh_token: Some("never-issued".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenNotRecognized));
    }

    #[tokio::test]
    async fn logout_all_revokes_every_session_of_the_user() {
        let (service, _pool) = test_service().await;
        let user = service
            .register(register_request("erin@example.com", "erin"))
            .await
            .unwrap();

        let first = service
            .login(login_request("erin@example.com", "swordfish-supreme"))
            .await
            .unwrap();
        let second = service
            .login(login_request("erin@example.com", "swordfish-supreme"))
            .await
            .unwrap();

        service.logout_all(&user.id).await.unwrap();

        for token in [first.refresh_token, second.refresh_token] {
            let err = service
                .refresh_token(RefreshTokenRequest {
                    refresh_token: Some(token),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::TokenNotRecognized));
        }
    }

    #[tokio::test]
    async fn verify_email_marks_the_account_verified() {
        let (service, pool) = test_service().await;
        let user = service
            .register(register_request("faye@example.com", "faye"))
            .await
            .unwrap();

        let token: String = sqlx::query_scalar(
            "SELECT token FROM email_verifications WHERE user_id = ? AND consumed_at IS NULL",
        )
        .bind(&user.id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let verified_id = service.verify_email(&token).await.unwrap();
        assert_eq!(verified_id, user.id);

        let current = service.current_user(&user.id).await.unwrap();
        assert!(current.email_verified);

        let err = service.verify_email(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Verification(_)));
    }
}
