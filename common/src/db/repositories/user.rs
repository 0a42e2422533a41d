// User repository

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{NewUser, User};
use chrono::Utc;
use tracing::instrument;

const USER_COLUMNS: &str = "id, username, email, password_hash, gender, avatar, address, bio, \
     birthday, following_count, follower_count, is_staff, is_active, created_at, updated_at";

/// Repository for user-related database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user and return the stored row
    #[instrument(skip(self, new_user))]
    pub async fn create(&self, new_user: &NewUser) -> Result<User, DatabaseError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, gender, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.gender)
        .bind(now)
        .bind(now)
        .execute(self.pool.pool())
        .await?;

        let id = result.last_insert_id() as i64;
        let user = self.find_by_id(id).await?.ok_or_else(|| {
            DatabaseError::QueryFailed(format!("Inserted user {} not readable", id))
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Find a user by ID
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(user)
    }

    /// Find a user by email
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(user)
    }

    /// Find a user matching either username or email (login lookup)
    #[instrument(skip(self))]
    pub async fn find_by_account(&self, account: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = ? OR email = ?",
            USER_COLUMNS
        ))
        .bind(account)
        .bind(account)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(user)
    }

    /// Whether an email is already registered
    #[instrument(skip(self))]
    pub async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count > 0)
    }

    /// Update a user's profile fields
    #[instrument(skip(self, user))]
    pub async fn update(&self, user: &User) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET gender = ?,
                avatar = ?,
                address = ?,
                bio = ?,
                birthday = ?,
                is_active = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(user.gender)
        .bind(&user.avatar)
        .bind(&user.address)
        .bind(&user.bio)
        .bind(user.birthday)
        .bind(user.is_active)
        .bind(Utc::now())
        .bind(user.id)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "User not found: {}",
                user.id
            )));
        }

        tracing::info!(user_id = %user.id, "User profile updated");
        Ok(())
    }

    /// Replace a user's password hash
    #[instrument(skip(self, password_hash))]
    pub async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "User not found: {}",
                user_id
            )));
        }

        Ok(())
    }

    /// Total number of users
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count)
    }

    /// One page of users, newest first
    #[instrument(skip(self))]
    pub async fn find_page(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(users)
    }
}
