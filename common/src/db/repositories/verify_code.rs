// Email verification code repository

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::EmailVerifyCode;
use chrono::Utc;
use tracing::instrument;

/// Repository for stored email verification codes
#[derive(Clone)]
pub struct VerifyCodeRepository {
    pool: DbPool,
}

impl VerifyCodeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a freshly generated code for an address
    #[instrument(skip(self, code))]
    pub async fn create(&self, email: &str, code: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO email_verify_codes (email, code, created_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(code)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        tracing::debug!(email = %email, "Verification code stored");
        Ok(())
    }

    /// The most recent code sent to an address, if any
    #[instrument(skip(self))]
    pub async fn find_latest_by_email(
        &self,
        email: &str,
    ) -> Result<Option<EmailVerifyCode>, DatabaseError> {
        let code = sqlx::query_as::<_, EmailVerifyCode>(
            r#"
            SELECT id, email, code, created_at
            FROM email_verify_codes
            WHERE email = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(code)
    }

    /// Drop every stored code for an address
    #[instrument(skip(self))]
    pub async fn delete_by_email(&self, email: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM email_verify_codes WHERE email = ?")
            .bind(email)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
