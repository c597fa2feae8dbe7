//! Persistence for single-use email-verification tokens.

use crate::database::models::EmailVerification;
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for verification-token database operations.
pub struct VerificationRepository {
    pool: SqlitePool,
}

impl VerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, verification: &EmailVerification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_verifications (token, user_id, created_at, expires_at, consumed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&verification.token)
        .bind(&verification.user_id)
        .bind(verification.created_at)
        .bind(verification.expires_at)
        .bind(verification.consumed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<EmailVerification>> {
        let verification = sqlx::query_as::<_, EmailVerification>(
            r#"
            SELECT token, user_id, created_at, expires_at, consumed_at
            FROM email_verifications WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(verification)
    }

    /// Stamps `consumed_at` on a still-pending token. Returns `false` when
    /// the token was already consumed (or does not exist), so a racing
    /// double-consume yields exactly one winner.
    pub async fn mark_consumed(&self, token: &str) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE email_verifications SET consumed_at = ? WHERE token = ? AND consumed_at IS NULL",
        )
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Drops any unconsumed tokens for the user; called before issuing a
    /// fresh one so only the latest link works.
    pub async fn invalidate_pending_for_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM email_verifications WHERE user_id = ? AND consumed_at IS NULL")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
