// Post repository.
//
// Creation and deletion adjust the owning category's post_count inside the
// same transaction so the counter can never drift from the rows.

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{NewPost, Post, PostWithAuthor};
use chrono::Utc;
use tracing::instrument;

const POST_COLUMNS: &str = "p.id, p.title, p.author_id, p.category_id, p.content, \
     p.like_count, p.read_count, p.comment_count, p.is_excellent, p.is_hot, p.is_top, \
     p.created_at, p.updated_at";

/// Repository for post-related database operations
#[derive(Clone)]
pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new post and bump the category's post_count
    #[instrument(skip(self, new_post), fields(category_id = new_post.category_id))]
    pub async fn create(&self, new_post: &NewPost) -> Result<Post, DatabaseError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, author_id, category_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_post.title)
        .bind(new_post.author_id)
        .bind(new_post.category_id)
        .bind(&new_post.content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_id() as i64;

        sqlx::query("UPDATE categories SET post_count = post_count + 1 WHERE id = ?")
            .bind(new_post.category_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let post = self.find_by_id(id).await?.ok_or_else(|| {
            DatabaseError::QueryFailed(format!("Inserted post {} not readable", id))
        })?;

        tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post created");
        Ok(post)
    }

    /// Find a post by ID
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts p WHERE p.id = ?",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(post)
    }

    /// Find a post joined with its author's username
    #[instrument(skip(self))]
    pub async fn find_by_id_with_author(
        &self,
        id: i64,
    ) -> Result<Option<PostWithAuthor>, DatabaseError> {
        let post = sqlx::query_as::<_, PostWithAuthor>(&format!(
            r#"
            SELECT {}, u.username AS author_username
            FROM posts p
            INNER JOIN users u ON u.id = p.author_id
            WHERE p.id = ?
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(post)
    }

    /// Number of posts, optionally within one category
    #[instrument(skip(self))]
    pub async fn count(&self, category_id: Option<i64>) -> Result<i64, DatabaseError> {
        let count: i64 = match category_id {
            Some(id) => sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE category_id = ?")
                .bind(id)
                .fetch_one(self.pool.pool())
                .await?,
            None => sqlx::query_scalar("SELECT COUNT(*) FROM posts")
                .fetch_one(self.pool.pool())
                .await?,
        };

        Ok(count)
    }

    /// One page of posts with authors: pinned posts first, then newest
    #[instrument(skip(self))]
    pub async fn find_page(
        &self,
        category_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, DatabaseError> {
        let posts = match category_id {
            Some(id) => {
                sqlx::query_as::<_, PostWithAuthor>(&format!(
                    r#"
                    SELECT {}, u.username AS author_username
                    FROM posts p
                    INNER JOIN users u ON u.id = p.author_id
                    WHERE p.category_id = ?
                    ORDER BY p.is_top DESC, p.created_at DESC, p.id DESC
                    LIMIT ? OFFSET ?
                    "#,
                    POST_COLUMNS
                ))
                .bind(id)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, PostWithAuthor>(&format!(
                    r#"
                    SELECT {}, u.username AS author_username
                    FROM posts p
                    INNER JOIN users u ON u.id = p.author_id
                    ORDER BY p.is_top DESC, p.created_at DESC, p.id DESC
                    LIMIT ? OFFSET ?
                    "#,
                    POST_COLUMNS
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool.pool())
                .await?
            }
        };

        Ok(posts)
    }

    /// Update a post's content fields; a category change moves the
    /// post_count between the old and new categories
    #[instrument(skip(self, title, content))]
    pub async fn update(
        &self,
        id: i64,
        title: &str,
        content: &str,
        new_category_id: Option<i64>,
    ) -> Result<Post, DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let old_category_id: Option<i64> =
            sqlx::query_scalar("SELECT category_id FROM posts WHERE id = ? FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let old_category_id =
            old_category_id.ok_or_else(|| DatabaseError::NotFound(format!("Post not found: {}", id)))?;

        let category_id = new_category_id.unwrap_or(old_category_id);

        sqlx::query(
            "UPDATE posts SET title = ?, content = ?, category_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(category_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if category_id != old_category_id {
            sqlx::query("UPDATE categories SET post_count = post_count - 1 WHERE id = ?")
                .bind(old_category_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE categories SET post_count = post_count + 1 WHERE id = ?")
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let post = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Post not found: {}", id)))?;

        tracing::info!(post_id = %id, "Post updated");
        Ok(post)
    }

    /// Delete a post and drop the category's post_count
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let category_id: Option<i64> =
            sqlx::query_scalar("SELECT category_id FROM posts WHERE id = ? FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let category_id =
            category_id.ok_or_else(|| DatabaseError::NotFound(format!("Post not found: {}", id)))?;

        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE categories SET post_count = post_count - 1 WHERE id = ?")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Bump the read counter for a post detail view
    #[instrument(skip(self))]
    pub async fn increment_read_count(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE posts SET read_count = read_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Post not found: {}", id)));
        }

        Ok(())
    }

    /// Bump the like counter
    #[instrument(skip(self))]
    pub async fn increment_like_count(&self, id: i64) -> Result<i32, DatabaseError> {
        let result = sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Post not found: {}", id)));
        }

        let like_count: i32 = sqlx::query_scalar("SELECT like_count FROM posts WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool.pool())
            .await?;

        Ok(like_count)
    }
}
