//! JWT token utilities for authentication and authorization.
//!
//! Provides token creation and validation with two distinct key classes:
//! short-lived access tokens (carrying the user's role) and long-lived
//! refresh tokens (identity only). A token signed for one class never
//! verifies against the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::database::models::Role;
use crate::errors::TokenError;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// User ID
    pub sub: String,
    /// User role at issuance time
    pub role: Role,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
}

/// Claims carried by a refresh token. Role is deliberately absent; it is
/// re-read from the user record when a new access token is minted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token together with its lifetime bounds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Token codec holding both key classes.
pub struct JwtUtils {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl JwtUtils {
    /// Builds the codec from the configured secrets and lifetimes.
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is a hard boundary; no clock-skew grace.
        validation.leeway = 0;

        JwtUtils {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_token_ttl_seconds as i64),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days as i64),
            validation,
        }
    }

    /// Access-token lifetime in seconds, as reported to clients.
    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl.num_seconds() as u64
    }

    /// Signs a new access token for the given identity.
    pub fn issue_access_token(&self, user_id: &str, role: Role) -> anyhow::Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;

        let claims = AccessClaims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.access_encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Signs a new refresh token for the given user.
    pub fn issue_refresh_token(&self, user_id: &str) -> anyhow::Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;

        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.refresh_encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Validates a token against the access key class.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }

    /// Validates a token against the refresh key class.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn fresh_access_token_verifies_with_its_identity() {
        let jwt = JwtUtils::new(&test_config());
        let issued = jwt.issue_access_token("user-1", Role::Admin).unwrap();

        let claims = jwt.verify_access_token(&issued.token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn refresh_token_round_trips() {
        let jwt = JwtUtils::new(&test_config());
        let issued = jwt.issue_refresh_token("user-2").unwrap();

        let claims = jwt.verify_refresh_token(&issued.token).unwrap();
        assert_eq!(claims.sub, "user-2");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn key_classes_are_not_interchangeable() {
        let jwt = JwtUtils::new(&test_config());
        let access = jwt.issue_access_token("user-3", Role::User).unwrap();
        let refresh = jwt.issue_refresh_token("user-3").unwrap();

        assert_eq!(
            jwt.verify_refresh_token(&access.token).unwrap_err(),
            TokenError::InvalidSignature
        );
        assert_eq!(
            jwt.verify_access_token(&refresh.token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn expired_access_token_is_rejected_as_expired() {
        let jwt = JwtUtils::new(&test_config());

        // Sign with the same access secret but an exp already in the past.
        let now = Utc::now();
        let claims = AccessClaims {
            sub: "user-4".to_string(),
            role: Role::User,
            iat: (now - Duration::seconds(120)).timestamp(),
            exp: (now - Duration::seconds(60)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(test_config().access_token_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(jwt.verify_access_token(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_input_is_malformed() {
        let jwt = JwtUtils::new(&test_config());
        assert_eq!(
            jwt.verify_access_token("not-a-token").unwrap_err(),
            TokenError::Malformed
        );
        assert_eq!(jwt.verify_refresh_token("").unwrap_err(), TokenError::Malformed);
    }
}
