use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Staff gate layered after authentication on administrative routes
#[tracing::instrument(skip(_state, req, next))]
pub async fn staff_middleware(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    // Set by auth_middleware
    let current_user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !current_user.0.is_staff {
        tracing::warn!(
            user_id = %current_user.0.id,
            username = %current_user.0.username,
            method = %req.method(),
            path = %req.uri().path(),
            "Non-staff user attempted an administrative operation"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    tracing::info!(
        user_id = %current_user.0.id,
        username = %current_user.0.username,
        method = %req.method(),
        path = %req.uri().path(),
        "Administrative operation"
    );

    Ok(next.run(req).await)
}
