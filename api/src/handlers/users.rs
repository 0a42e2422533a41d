use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use common::auth::{AuthService, JwtService};
use common::db::repositories::user::UserRepository;
use common::db::repositories::verify_code::VerifyCodeRepository;
use common::errors::AuthError;
use common::models::{Gender, User};
use common::pagination::Page;
use serde::{Deserialize, Serialize};

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Public profile view of an account
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub gender: Gender,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub following_count: i32,
    pub follower_count: i32,
    pub is_staff: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            gender: user.gender,
            avatar: user.avatar,
            address: user.address,
            bio: user.bio,
            birthday: user.birthday,
            following_count: user.following_count,
            follower_count: user.follower_count,
            is_staff: user.is_staff,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub gender: Option<Gender>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
}

/// The authenticated user's profile
#[tracing::instrument(skip(current_user))]
pub async fn me(
    Extension(current_user): Extension<CurrentUser>,
) -> Json<SuccessResponse<UserResponse>> {
    Json(SuccessResponse::new(UserResponse::from(current_user.0)))
}

/// Update the authenticated user's profile fields
#[tracing::instrument(skip(state, current_user, req))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse<UserResponse>>, ErrorResponse> {
    if let Some(bio) = &req.bio {
        if bio.len() > 1000 {
            return Err(ErrorResponse::field_error("bio", "Bio is too long"));
        }
    }
    if let Some(address) = &req.address {
        if address.len() > 100 {
            return Err(ErrorResponse::field_error("address", "Address is too long"));
        }
    }
    if let Some(avatar) = &req.avatar {
        if avatar.len() > 200 {
            return Err(ErrorResponse::field_error("avatar", "Avatar URL is too long"));
        }
    }

    let mut user = current_user.0;
    if let Some(gender) = req.gender {
        user.gender = gender;
    }
    if req.avatar.is_some() {
        user.avatar = req.avatar;
    }
    if req.address.is_some() {
        user.address = req.address;
    }
    if req.bio.is_some() {
        user.bio = req.bio;
    }
    if req.birthday.is_some() {
        user.birthday = req.birthday;
    }

    let repo = UserRepository::new(state.db_pool.clone());
    repo.update(&user).await.map_err(|e| {
        tracing::error!(error = %e, user_id = %user.id, "Failed to update profile");
        ErrorResponse::new("internal_error", "Failed to update profile")
    })?;

    let refreshed = repo
        .find_by_id(user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "Failed to reload profile");
            ErrorResponse::new("internal_error", "Failed to reload profile")
        })?
        .ok_or_else(|| ErrorResponse::new("not_found", "User not found"))?;

    Ok(Json(SuccessResponse::new(UserResponse::from(refreshed))))
}

/// Change the authenticated user's password
#[tracing::instrument(skip(state, current_user, req))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse<serde_json::Value>>, ErrorResponse> {
    if req.new_password.len() < 8 {
        return Err(ErrorResponse::field_error(
            "new_password",
            "Password must be at least 8 characters",
        ));
    }

    let jwt_service = JwtService::new(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_expiration_hours,
    );
    let service = AuthService::new(
        jwt_service,
        UserRepository::new(state.db_pool.clone()),
        VerifyCodeRepository::new(state.db_pool.clone()),
        state.config.email.code_ttl_minutes,
    );

    service
        .change_password(current_user.0.id, &req.old_password, &req.new_password)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %current_user.0.id, error = %e, "Password change failed");
            match e {
                AuthError::InvalidCredentials => {
                    ErrorResponse::field_error("old_password", "Current password is incorrect")
                }
                _ => ErrorResponse::new("internal_error", "Failed to change password"),
            }
        })?;

    Ok(Json(SuccessResponse::new(serde_json::json!({
        "detail": "Password updated"
    }))))
}

/// Staff-only paginated user listing
#[tracing::instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Page<UserResponse>>, ErrorResponse> {
    let page = query.page.unwrap_or(1);
    let paginator = state.paginator();

    let repo = UserRepository::new(state.db_pool.clone());
    let count = repo.count().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count users");
        ErrorResponse::new("internal_error", "Failed to list users")
    })?;

    paginator
        .validate(page, count)
        .map_err(|_| ErrorResponse::new("validation_error", "Invalid page"))?;

    let users = repo
        .find_page(paginator.limit(), paginator.offset(page))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            ErrorResponse::new("internal_error", "Failed to list users")
        })?;

    let results = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(paginator.page(
        &state.config.server.site_url,
        "/api/users",
        page,
        count,
        results,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: 3,
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            gender: Gender::Female,
            avatar: None,
            address: Some("Shanghai".to_string()),
            bio: None,
            birthday: None,
            following_count: 2,
            follower_count: 5,
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_response_from_user() {
        let user = sample_user();
        let response = UserResponse::from(user.clone());
        assert_eq!(response.id, user.id);
        assert_eq!(response.username, user.username);
        assert_eq!(response.email, user.email);
        assert_eq!(response.follower_count, 5);
    }

    #[test]
    fn test_user_response_has_no_password() {
        let response = UserResponse::from(sample_user());
        let json = serde_json::to_string(&response).expect("Failed to serialize");
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_update_profile_request_partial_deserialization() {
        let json = r#"{"bio": "hello", "gender": "female"}"#;
        let req: UpdateProfileRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.bio.as_deref(), Some("hello"));
        assert_eq!(req.gender, Some(Gender::Female));
        assert!(req.avatar.is_none());
        assert!(req.birthday.is_none());
    }

    #[test]
    fn test_change_password_request_deserialization() {
        let json = r#"{"old_password": "oldpass123", "new_password": "newpass123"}"#;
        let req: ChangePasswordRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.old_password, "oldpass123");
        assert_eq!(req.new_password, "newpass123");
    }
}
