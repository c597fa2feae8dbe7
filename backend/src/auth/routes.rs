//! Defines the HTTP routes specifically for authentication.
//!
//! These routes handle registration, email verification, login, token
//! refresh, and session revocation. Role requirements are declared here by
//! layering the gate middleware per route.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route(
            "/logout-all",
            post(logout_all).layer(middleware::from_fn(jwt_auth)),
        )
        .route("/me", get(me).layer(middleware::from_fn(jwt_auth)))
        .route(
            "/sessions",
            get(list_sessions)
                .layer(middleware::from_fn(require_admin))
                .layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/sessions/{user_id}",
            delete(revoke_user_sessions)
                .layer(middleware::from_fn(require_admin))
                .layer(middleware::from_fn(jwt_auth)),
        )
}
