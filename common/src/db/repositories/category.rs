// Category repository

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::Category;
use chrono::Utc;
use tracing::instrument;

const CATEGORY_COLUMNS: &str = "id, name, description, post_count, created_at, updated_at";

/// Repository for category-related database operations
#[derive(Clone)]
pub struct CategoryRepository {
    pool: DbPool,
}

impl CategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new category and return the stored row
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str, description: &str) -> Result<Category, DatabaseError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO categories (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(self.pool.pool())
        .await?;

        let id = result.last_insert_id() as i64;
        let category = self.find_by_id(id).await?.ok_or_else(|| {
            DatabaseError::QueryFailed(format!("Inserted category {} not readable", id))
        })?;

        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Find a category by ID
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Category>, DatabaseError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = ?",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(category)
    }

    /// Total number of categories
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count)
    }

    /// One page of categories, newest first
    #[instrument(skip(self))]
    pub async fn find_page(&self, limit: i64, offset: i64) -> Result<Vec<Category>, DatabaseError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            CATEGORY_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(categories)
    }

    /// Whether another category already uses this name.
    /// `exclude_id` skips the row being renamed.
    #[instrument(skip(self))]
    pub async fn name_exists(
        &self,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DatabaseError> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ? AND id != ?")
                    .bind(name)
                    .bind(id)
                    .fetch_one(self.pool.pool())
                    .await?
            }
            None => sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ?")
                .bind(name)
                .fetch_one(self.pool.pool())
                .await?,
        };

        Ok(count > 0)
    }

    /// Rename/redescribe a category and return the stored row
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        description: &str,
    ) -> Result<Category, DatabaseError> {
        let result = sqlx::query(
            "UPDATE categories SET name = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Category not found: {}", id)));
        }

        let category = self.find_by_id(id).await?.ok_or_else(|| {
            DatabaseError::NotFound(format!("Category not found: {}", id))
        })?;

        tracing::info!(category_id = %id, "Category updated");
        Ok(category)
    }

    /// Delete a category; its posts go with it (FK cascade)
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Category not found: {}", id)));
        }

        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}
