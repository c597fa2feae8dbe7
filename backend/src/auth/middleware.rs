//! Middleware for protecting authenticated routes and handling authorization.
//!
//! The gate runs in two layers: `jwt_auth` establishes identity from the
//! bearer token and attaches it as a typed extension value, and
//! `require_admin` layers a role requirement on top. Handlers never
//! re-check roles themselves.

use crate::api::common::auth_error_to_http;
use crate::auth::models::AuthIdentity;
use crate::database::models::Role;
use crate::errors::AuthError;
use crate::utils::jwt::JwtUtils;
use axum::{
    extract::Request,
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Bearer-token authentication middleware.
///
/// A missing or empty token is unauthenticated (401); a present token that
/// fails verification for any reason is forbidden (403).
pub async fn jwt_auth(mut request: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let jwt = request
        .extensions()
        .get::<Arc<JwtUtils>>()
        .cloned()
        .ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "token codec not configured".to_string(),
        ))?;

    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    let token = match bearer {
        Some(token) if !token.is_empty() => token,
        _ => return Err(auth_error_to_http(AuthError::MissingToken)),
    };

    match jwt.verify_access_token(token) {
        Ok(claims) => {
            let identity = AuthIdentity {
                user_id: claims.sub,
                role: claims.role,
            };
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(_) => Err(auth_error_to_http(AuthError::TokenInvalidOrExpired)),
    }
}

/// Admin role requirement, layered on top of `jwt_auth`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let identity = request
        .extensions()
        .get::<AuthIdentity>()
        .ok_or_else(|| auth_error_to_http(AuthError::MissingToken))?;

    match identity.role {
        Role::Admin => Ok(next.run(request).await),
        Role::User => Err(auth_error_to_http(AuthError::RoleMismatch)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{Extension, Router, body::Body, http::Request as HttpRequest, middleware, routing::get};
    use tower::ServiceExt;

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

    fn gated_router(jwt: Arc<JwtUtils>) -> Router {
        Router::new()
            .route(
                "/protected",
                get(|| async { StatusCode::OK }).layer(middleware::from_fn(jwt_auth)),
            )
            .route(
                "/admin-only",
                get(|| async { StatusCode::OK })
                    .layer(middleware::from_fn(require_admin))
                    .layer(middleware::from_fn(jwt_auth)),
            )
            .layer(Extension(jwt))
    }

    async fn get_status(router: &Router, uri: &str, bearer: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn missing_bearer_is_unauthenticated() {
        let jwt = Arc::new(JwtUtils::new(&test_config()));
        let router = gated_router(jwt);

        assert_eq!(
            get_status(&router, "/protected", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(&router, "/protected", Some("")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn invalid_tokens_are_forbidden() {
        let jwt = Arc::new(JwtUtils::new(&test_config()));
        let router = gated_router(jwt.clone());

        assert_eq!(
            get_status(&router, "/protected", Some("garbage")).await,
            StatusCode::FORBIDDEN
        );

        // A refresh token is not an access token, even though it is a
        // well-formed signed JWT.
        let refresh = jwt.issue_refresh_token("u1").unwrap();
        assert_eq!(
            get_status(&router, "/protected", Some(&refresh.token)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn verified_identity_passes_the_base_gate() {
        let jwt = Arc::new(JwtUtils::new(&test_config()));
        let router = gated_router(jwt.clone());

        let access = jwt.issue_access_token("u1", Role::User).unwrap();
        assert_eq!(
            get_status(&router, "/protected", Some(&access.token)).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn role_requirement_admits_admins_only() {
        let jwt = Arc::new(JwtUtils::new(&test_config()));
        let router = gated_router(jwt.clone());

        let user = jwt.issue_access_token("u1", Role::User).unwrap();
        assert_eq!(
            get_status(&router, "/admin-only", Some(&user.token)).await,
            StatusCode::FORBIDDEN
        );

        let admin = jwt.issue_access_token("u2", Role::Admin).unwrap();
        assert_eq!(
            get_status(&router, "/admin-only", Some(&admin.token)).await,
            StatusCode::OK
        );

        assert_eq!(
            get_status(&router, "/admin-only", None).await,
            StatusCode::UNAUTHORIZED
        );
    }
}
