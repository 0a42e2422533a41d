use axum::{
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use common::auth::JwtService;
use common::db::repositories::user::UserRepository;
use common::models::User;

use crate::state::AppState;

/// The authenticated account, re-fetched from the database per request.
/// A valid token for a deleted or disabled account does not authenticate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authentication middleware that validates JWT tokens and loads the user
#[tracing::instrument(skip(state, req, next))]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Check if it's a Bearer token
    if !auth_header.starts_with("Bearer ") {
        tracing::warn!("Invalid authorization header format");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = &auth_header[7..]; // Skip "Bearer "

    let jwt_service = JwtService::new(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_expiration_hours,
    );

    let claims = jwt_service.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "Failed to validate token");
        StatusCode::UNAUTHORIZED
    })?;

    let user_id: i64 = claims.sub.parse().map_err(|_| {
        tracing::warn!(sub = %claims.sub, "Token subject is not a user id");
        StatusCode::UNAUTHORIZED
    })?;

    let repo = UserRepository::new(state.db_pool.clone());
    let user = repo
        .find_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to load token user");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Token user no longer exists");
            StatusCode::UNAUTHORIZED
        })?;

    if !user.is_active {
        tracing::warn!(user_id = %user_id, "Token user is disabled");
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Insert the user into request extensions for use by handlers
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
