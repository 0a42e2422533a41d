use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use common::db::repositories::category::CategoryRepository;
use common::db::repositories::post::PostRepository;
use common::errors::DatabaseError;
use common::models::{NewPost, Post, PostWithAuthor};
use common::pagination::Page;
use serde::{Deserialize, Serialize};

use crate::handlers::{CreatedResponse, ErrorResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostForm {
    pub title: String,
    pub content: String,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    /// Restrict the listing to one category
    pub category: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub id: i64,
    pub like_count: i32,
}

fn validate_title_content(title: &str, content: &str) -> Result<(), ErrorResponse> {
    if title.is_empty() || title.chars().count() > 50 {
        return Err(ErrorResponse::field_error(
            "title",
            "Title must be between 1 and 50 characters",
        ));
    }
    if content.is_empty() {
        return Err(ErrorResponse::field_error("content", "Content is required"));
    }
    Ok(())
}

/// List posts: pinned first, then newest, optionally within one category
#[tracing::instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Page<PostWithAuthor>>, ErrorResponse> {
    let page = query.page.unwrap_or(1);
    let paginator = state.paginator();

    let repo = PostRepository::new(state.db_pool.clone());
    let count = repo.count(query.category).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count posts");
        ErrorResponse::new("internal_error", "Failed to list posts")
    })?;

    paginator
        .validate(page, count)
        .map_err(|_| ErrorResponse::new("validation_error", "Invalid page"))?;

    let posts = repo
        .find_page(query.category, paginator.limit(), paginator.offset(page))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list posts");
            ErrorResponse::new("internal_error", "Failed to list posts")
        })?;

    tracing::debug!(count = count, page = page, "Listed posts");
    Ok(Json(paginator.page(
        &state.config.server.site_url,
        "/api/posts",
        page,
        count,
        posts,
    )))
}

/// Create a post under an existing category
#[tracing::instrument(skip(state, current_user, form))]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(form): Json<PostForm>,
) -> Result<CreatedResponse<Post>, ErrorResponse> {
    validate_title_content(&form.title, &form.content)?;

    let category_repo = CategoryRepository::new(state.db_pool.clone());
    category_repo
        .find_by_id(form.category_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch category");
            ErrorResponse::new("internal_error", "Failed to create post")
        })?
        .ok_or_else(|| {
            ErrorResponse::new(
                "not_found",
                format!("Category not found: {}", form.category_id),
            )
        })?;

    let repo = PostRepository::new(state.db_pool.clone());
    let post = repo
        .create(&NewPost {
            title: form.title,
            author_id: current_user.0.id,
            category_id: form.category_id,
            content: form.content,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create post");
            ErrorResponse::new("internal_error", "Failed to create post")
        })?;

    metrics::counter!("posts_created_total").increment(1);
    tracing::info!(post_id = %post.id, author_id = %current_user.0.id, "Post created");
    Ok(CreatedResponse::new(post))
}

/// Post detail with author; every view bumps the read counter
#[tracing::instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse<PostWithAuthor>>, ErrorResponse> {
    let repo = PostRepository::new(state.db_pool.clone());

    repo.increment_read_count(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => {
            ErrorResponse::new("not_found", format!("Post not found: {}", id))
        }
        _ => {
            tracing::error!(error = %e, post_id = %id, "Failed to record read");
            ErrorResponse::new("internal_error", "Failed to fetch post")
        }
    })?;

    let post = repo
        .find_by_id_with_author(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, post_id = %id, "Failed to fetch post");
            ErrorResponse::new("internal_error", "Failed to fetch post")
        })?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Post not found: {}", id)))?;

    Ok(Json(SuccessResponse::new(post)))
}

/// Update a post; only its author may edit it
#[tracing::instrument(skip(state, current_user, form))]
pub async fn update_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(form): Json<UpdatePostForm>,
) -> Result<Json<SuccessResponse<Post>>, ErrorResponse> {
    validate_title_content(&form.title, &form.content)?;

    let repo = PostRepository::new(state.db_pool.clone());
    let existing = repo
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, post_id = %id, "Failed to fetch post");
            ErrorResponse::new("internal_error", "Failed to update post")
        })?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Post not found: {}", id)))?;

    if existing.author_id != current_user.0.id {
        tracing::warn!(
            post_id = %id,
            author_id = %existing.author_id,
            user_id = %current_user.0.id,
            "Edit attempt by non-author"
        );
        return Err(ErrorResponse::new(
            "forbidden",
            "Only the author may edit this post",
        ));
    }

    if let Some(category_id) = form.category_id {
        let category_repo = CategoryRepository::new(state.db_pool.clone());
        category_repo
            .find_by_id(category_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch category");
                ErrorResponse::new("internal_error", "Failed to update post")
            })?
            .ok_or_else(|| {
                ErrorResponse::new("not_found", format!("Category not found: {}", category_id))
            })?;
    }

    let post = repo
        .update(id, &form.title, &form.content, form.category_id)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => {
                ErrorResponse::new("not_found", format!("Post not found: {}", id))
            }
            _ => {
                tracing::error!(error = %e, post_id = %id, "Failed to update post");
                ErrorResponse::new("internal_error", "Failed to update post")
            }
        })?;

    tracing::info!(post_id = %id, user_id = %current_user.0.id, "Post updated");
    Ok(Json(SuccessResponse::new(post)))
}

/// Delete a post; allowed for its author and for staff
#[tracing::instrument(skip(state, current_user))]
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse<serde_json::Value>>, ErrorResponse> {
    let repo = PostRepository::new(state.db_pool.clone());
    let existing = repo
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, post_id = %id, "Failed to fetch post");
            ErrorResponse::new("internal_error", "Failed to delete post")
        })?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Post not found: {}", id)))?;

    if existing.author_id != current_user.0.id && !current_user.0.is_staff {
        tracing::warn!(
            post_id = %id,
            author_id = %existing.author_id,
            user_id = %current_user.0.id,
            "Delete attempt by non-author"
        );
        return Err(ErrorResponse::new(
            "forbidden",
            "Only the author or staff may delete this post",
        ));
    }

    repo.delete(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => {
            ErrorResponse::new("not_found", format!("Post not found: {}", id))
        }
        _ => {
            tracing::error!(error = %e, post_id = %id, "Failed to delete post");
            ErrorResponse::new("internal_error", "Failed to delete post")
        }
    })?;

    Ok(Json(SuccessResponse::new(serde_json::json!({
        "detail": "Post deleted"
    }))))
}

/// Like a post
#[tracing::instrument(skip(state, _current_user))]
pub async fn like_post(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse<LikeResponse>>, ErrorResponse> {
    let repo = PostRepository::new(state.db_pool.clone());

    let like_count = repo.increment_like_count(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => {
            ErrorResponse::new("not_found", format!("Post not found: {}", id))
        }
        _ => {
            tracing::error!(error = %e, post_id = %id, "Failed to like post");
            ErrorResponse::new("internal_error", "Failed to like post")
        }
    })?;

    Ok(Json(SuccessResponse::new(LikeResponse { id, like_count })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_form_deserialization() {
        let json = r#"{"title": "Hello", "content": "World", "category_id": 3}"#;
        let form: PostForm = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(form.title, "Hello");
        assert_eq!(form.category_id, 3);
    }

    #[test]
    fn test_update_post_form_optional_category() {
        let json = r#"{"title": "Hello", "content": "World"}"#;
        let form: UpdatePostForm = serde_json::from_str(json).expect("Failed to deserialize");
        assert!(form.category_id.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_title() {
        assert!(validate_title_content("", "content").is_err());
    }

    #[test]
    fn test_validate_rejects_long_title() {
        let title = "x".repeat(51);
        assert!(validate_title_content(&title, "content").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_content() {
        assert!(validate_title_content("title", "").is_err());
    }

    #[test]
    fn test_validate_accepts_boundary_title() {
        let title = "x".repeat(50);
        assert!(validate_title_content(&title, "content").is_ok());
    }

    #[test]
    fn test_list_posts_query_deserialization() {
        let query: ListPostsQuery =
            serde_json::from_str(r#"{"page": 2, "category": 7}"#).expect("Failed to deserialize");
        assert_eq!(query.page, Some(2));
        assert_eq!(query.category, Some(7));
    }
}
