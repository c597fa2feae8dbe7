//! Main entry point for the Tidepool backend.
//!
//! This file initializes the Axum web server, sets up the database pool and
//! the injected auth collaborators (user repository, password hasher,
//! refresh-session store, token codec), and registers all API routes.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod utils;

use crate::api::common::ApiResponse;
use crate::auth::password::{BcryptPasswordHasher, PasswordHasher};
use crate::auth::service::AuthService;
use crate::repositories::session_repository::{RefreshSessionStore, SqliteSessionStore};
use crate::repositories::user_repository::{SqliteUserRepository, UserRepository};
use crate::repositories::verification_repository::VerificationRepository;
use crate::services::email_service::EmailService;
use crate::services::verification_service::VerificationService;
use crate::utils::jwt::JwtUtils;
use axum::{Extension, Router, response::Json, routing::get};
use config::Config;
use database::Database;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() {
    init();

    let config = Config::from_env().unwrap();
    let db = Database::new(&config).await.unwrap();
    let pool = db.pool().clone();

    let users: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
    let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::default());
    let sessions: Arc<dyn RefreshSessionStore> = Arc::new(SqliteSessionStore::new(pool.clone()));
    let jwt_utils = Arc::new(JwtUtils::new(&config));

    let email_service = match config.email_config() {
        Some(email_config) => match EmailService::new(email_config) {
            Ok(service) => {
                info!("Email service initialized successfully");
                Some(service)
            }
            Err(e) => {
                warn!(
                    "Failed to initialize email service: {}. Verification emails will be logged only.",
                    e
                );
                None
            }
        },
        None => {
            warn!("Email configuration not found. Verification emails will be logged only.");
            None
        }
    };

    let verification = VerificationService::new(
        VerificationRepository::new(pool.clone()),
        users.clone(),
        email_service,
        &config,
    );

    let auth_service = Arc::new(AuthService::new(
        users,
        hasher,
        sessions,
        jwt_utils.clone(),
        verification,
    ));

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/auth", auth::routes::auth_router())
        .layer(Extension(auth_service))
        .layer(Extension(jwt_utils));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();

    info!("Starting Tidepool server on port {}", config.server_port);
    axum::serve(listener, app).await.unwrap();
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "Tidepool Backend",
            "version": "0.1.0"
        }),
        "Welcome to the Tidepool API",
    ))
}
