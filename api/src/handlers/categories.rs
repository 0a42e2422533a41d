use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use common::db::repositories::category::CategoryRepository;
use common::errors::DatabaseError;
use common::models::Category;
use common::pagination::Page;
use serde::Deserialize;

use crate::handlers::{CreatedResponse, ErrorResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    pub page: Option<i64>,
}

fn validate_form(form: &CategoryForm) -> Result<(), ErrorResponse> {
    if form.name.is_empty() || form.name.chars().count() > 50 {
        return Err(ErrorResponse::field_error(
            "name",
            "Name must be between 1 and 50 characters",
        ));
    }
    if form.description.is_empty() || form.description.chars().count() > 250 {
        return Err(ErrorResponse::field_error(
            "description",
            "Description must be between 1 and 250 characters",
        ));
    }
    Ok(())
}

/// List categories, newest first, one page at a time
#[tracing::instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<Page<Category>>, ErrorResponse> {
    let page = query.page.unwrap_or(1);
    let paginator = state.paginator();

    let repo = CategoryRepository::new(state.db_pool.clone());
    let count = repo.count().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count categories");
        ErrorResponse::new("internal_error", "Failed to list categories")
    })?;

    paginator
        .validate(page, count)
        .map_err(|_| ErrorResponse::new("validation_error", "Invalid page"))?;

    let categories = repo
        .find_page(paginator.limit(), paginator.offset(page))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list categories");
            ErrorResponse::new("internal_error", "Failed to list categories")
        })?;

    tracing::debug!(count = count, page = page, "Listed categories");
    Ok(Json(paginator.page(
        &state.config.server.site_url,
        "/api/categories",
        page,
        count,
        categories,
    )))
}

/// Create a category; names are unique
#[tracing::instrument(skip(state, current_user, form))]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(form): Json<CategoryForm>,
) -> Result<CreatedResponse<Category>, ErrorResponse> {
    validate_form(&form)?;

    let repo = CategoryRepository::new(state.db_pool.clone());
    let taken = repo.name_exists(&form.name, None).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to check category name");
        ErrorResponse::new("internal_error", "Failed to create category")
    })?;
    if taken {
        return Err(ErrorResponse::field_error(
            "name",
            "Category name already exists",
        ));
    }

    let category = repo
        .create(&form.name, &form.description)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create category");
            match e {
                DatabaseError::DuplicateKey(_) => {
                    ErrorResponse::new("conflict", "Category name already exists")
                }
                _ => ErrorResponse::new("internal_error", "Failed to create category"),
            }
        })?;

    tracing::info!(category_id = %category.id, user_id = %current_user.0.id, "Category created");
    Ok(CreatedResponse::new(category))
}

/// Category detail
#[tracing::instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse<Category>>, ErrorResponse> {
    let repo = CategoryRepository::new(state.db_pool.clone());

    let category = repo
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, category_id = %id, "Failed to fetch category");
            ErrorResponse::new("internal_error", "Failed to fetch category")
        })?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Category not found: {}", id)))?;

    Ok(Json(SuccessResponse::new(category)))
}

/// Rename/redescribe a category; the name must stay unique among the others
#[tracing::instrument(skip(state, current_user, form))]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<SuccessResponse<Category>>, ErrorResponse> {
    validate_form(&form)?;

    let repo = CategoryRepository::new(state.db_pool.clone());

    repo.find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, category_id = %id, "Failed to fetch category");
            ErrorResponse::new("internal_error", "Failed to update category")
        })?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Category not found: {}", id)))?;

    // The row being renamed may keep its own name
    let taken = repo.name_exists(&form.name, Some(id)).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to check category name");
        ErrorResponse::new("internal_error", "Failed to update category")
    })?;
    if taken {
        return Err(ErrorResponse::field_error(
            "name",
            "Category name already exists",
        ));
    }

    let category = repo
        .update(id, &form.name, &form.description)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => {
                ErrorResponse::new("not_found", format!("Category not found: {}", id))
            }
            _ => {
                tracing::error!(error = %e, category_id = %id, "Failed to update category");
                ErrorResponse::new("internal_error", "Failed to update category")
            }
        })?;

    tracing::info!(category_id = %id, user_id = %current_user.0.id, "Category updated");
    Ok(Json(SuccessResponse::new(category)))
}

/// Delete a category (staff only, enforced by the route layer)
#[tracing::instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse<serde_json::Value>>, ErrorResponse> {
    let repo = CategoryRepository::new(state.db_pool.clone());

    repo.delete(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => {
            ErrorResponse::new("not_found", format!("Category not found: {}", id))
        }
        _ => {
            tracing::error!(error = %e, category_id = %id, "Failed to delete category");
            ErrorResponse::new("internal_error", "Failed to delete category")
        }
    })?;

    Ok(Json(SuccessResponse::new(serde_json::json!({
        "detail": "Category deleted"
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_form_deserialization() {
        let json = r#"{"name": "rust", "description": "Posts about Rust"}"#;
        let form: CategoryForm = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(form.name, "rust");
        assert_eq!(form.description, "Posts about Rust");
    }

    #[test]
    fn test_validate_form_rejects_empty_name() {
        let form = CategoryForm {
            name: String::new(),
            description: "desc".to_string(),
        };
        assert!(validate_form(&form).is_err());
    }

    #[test]
    fn test_validate_form_rejects_long_name() {
        let form = CategoryForm {
            name: "x".repeat(51),
            description: "desc".to_string(),
        };
        assert!(validate_form(&form).is_err());
    }

    #[test]
    fn test_validate_form_rejects_long_description() {
        let form = CategoryForm {
            name: "ok".to_string(),
            description: "y".repeat(251),
        };
        assert!(validate_form(&form).is_err());
    }

    #[test]
    fn test_validate_form_accepts_boundary_lengths() {
        let form = CategoryForm {
            name: "x".repeat(50),
            description: "y".repeat(250),
        };
        assert!(validate_form(&form).is_ok());
    }
}
