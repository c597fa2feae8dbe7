//! Revocable store for refresh-token sessions.
//!
//! Signature checking alone cannot revoke a refresh token before its natural
//! expiry, so every issued refresh token is also tracked here and is only
//! honored while the store says it is active. All mutations are serialized
//! per key: a revoke that completes before a lookup begins is always
//! observed by that lookup.

use crate::database::models::RefreshSession;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Server-side registry of refresh-token sessions.
#[async_trait]
pub trait RefreshSessionStore: Send + Sync {
    /// Inserts an active entry. Registering a token that already exists is
    /// a no-op; the original entry (including its revoked flag) wins.
    async fn register(&self, session: RefreshSession) -> Result<()>;

    /// True iff the entry exists, is not revoked, and is not past expiry.
    async fn is_active(&self, token: &str) -> Result<bool>;

    /// Marks the entry revoked. Idempotent; unknown tokens are ignored.
    async fn revoke(&self, token: &str) -> Result<()>;

    /// Revokes every session owned by the user.
    async fn revoke_all(&self, user_id: &str) -> Result<()>;

    /// All currently active sessions, for operator inspection.
    async fn active_sessions(&self) -> Result<Vec<RefreshSession>>;
}

/// Durable sqlite-backed store; the production default. Sessions survive a
/// process restart, and sqlite's write serialization keeps concurrent
/// register/revoke/lookup calls consistent per token.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshSessionStore for SqliteSessionStore {
    async fn register(&self, session: RefreshSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO refresh_sessions (token, user_id, issued_at, expires_at, revoked)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_active(&self, token: &str) -> Result<bool> {
        let session = sqlx::query_as::<_, RefreshSession>(
            "SELECT token, user_id, issued_at, expires_at, revoked FROM refresh_sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session
            .map(|s| !s.revoked && Utc::now() < s.expires_at)
            .unwrap_or(false))
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE refresh_sessions SET revoked = TRUE WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all(&self, user_id: &str) -> Result<()> {
        sqlx::query("UPDATE refresh_sessions SET revoked = TRUE WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn active_sessions(&self) -> Result<Vec<RefreshSession>> {
        let sessions = sqlx::query_as::<_, RefreshSession>(
            r#"
            SELECT token, user_id, issued_at, expires_at, revoked
            FROM refresh_sessions
            WHERE revoked = FALSE AND expires_at > ?
            ORDER BY issued_at DESC
            "#,
        )
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

/// Map-backed store guarded by a single `RwLock`; every mutation takes the
/// write guard, so lookups never observe a half-applied revoke.
///
/// Known limitation: sessions are lost on restart. Intended for tests and
/// local development; production deployments use [`SqliteSessionStore`].
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, RefreshSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshSessionStore for InMemorySessionStore {
    async fn register(&self, session: RefreshSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session.token.clone()).or_insert(session);
        Ok(())
    }

    async fn is_active(&self, token: &str) -> Result<bool> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .map(|s| !s.revoked && Utc::now() < s.expires_at)
            .unwrap_or(false))
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(token) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn revoke_all(&self, user_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        for session in sessions.values_mut() {
            if session.user_id == user_id {
                session.revoked = true;
            }
        }
        Ok(())
    }

    async fn active_sessions(&self) -> Result<Vec<RefreshSession>> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        Ok(sessions
            .values()
            .filter(|s| !s.revoked && now < s.expires_at)
            .cloned()
            .collect())
    }
}
