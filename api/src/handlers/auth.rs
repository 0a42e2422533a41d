use axum::{extract::State, Json};
use common::auth::{generate_verification_code, AuthService, JwtService};
use common::db::repositories::user::UserRepository;
use common::db::repositories::verify_code::VerifyCodeRepository;
use common::errors::AuthError;
use common::models::{Gender, User};
use serde::{Deserialize, Serialize};

use crate::handlers::{is_valid_email, CreatedResponse, ErrorResponse, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SendCodeResponse {
    pub email: String,
    pub detail: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub code: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub gender: Gender,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for RegisterResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            gender: user.gender,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub account: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub token: String,
}

fn auth_service(state: &AppState) -> AuthService {
    let jwt_service = JwtService::new(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_expiration_hours,
    );
    AuthService::new(
        jwt_service,
        UserRepository::new(state.db_pool.clone()),
        VerifyCodeRepository::new(state.db_pool.clone()),
        state.config.email.code_ttl_minutes,
    )
}

/// Send an email verification code for registration
#[tracing::instrument(skip(state, req))]
pub async fn send_code(
    State(state): State<AppState>,
    Json(req): Json<SendCodeRequest>,
) -> Result<Json<SuccessResponse<SendCodeResponse>>, ErrorResponse> {
    if !is_valid_email(&req.email) {
        return Err(ErrorResponse::field_error("email", "A valid email is required"));
    }

    // A registered address cannot request registration codes
    let user_repo = UserRepository::new(state.db_pool.clone());
    let taken = user_repo.email_exists(&req.email).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to check email");
        ErrorResponse::new("internal_error", "Failed to check email")
    })?;
    if taken {
        return Err(ErrorResponse::field_error("email", "Email already registered"));
    }

    // One send per address per resend window
    let limiter = state.code_rate_limiter();
    let allowed = limiter
        .check_send_allowed(&req.email, 1, state.config.email.resend_interval_seconds)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Rate limit check failed");
            ErrorResponse::new("internal_error", "Failed to check resend window")
        })?;
    if !allowed {
        return Err(ErrorResponse::new(
            "rate_limit_exceeded",
            "A code was already sent recently, try again in a minute",
        ));
    }

    let code = generate_verification_code(state.config.email.code_length);

    let code_repo = VerifyCodeRepository::new(state.db_pool.clone());
    code_repo.create(&req.email, &code).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store verification code");
        ErrorResponse::new("internal_error", "Failed to store verification code")
    })?;

    state
        .mailer
        .send_verification_code(&req.email, &code, state.config.email.code_ttl_minutes)
        .await;

    tracing::info!(email = %req.email, "Verification code sent");

    Ok(Json(SuccessResponse::new(SendCodeResponse {
        email: req.email,
        detail: "Verification code sent".to_string(),
    })))
}

/// Register an account with an emailed verification code
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<CreatedResponse<RegisterResponse>, ErrorResponse> {
    if !is_valid_email(&req.email) {
        return Err(ErrorResponse::field_error("email", "A valid email is required"));
    }
    if req.code.len() != state.config.email.code_length as usize {
        return Err(ErrorResponse::field_error("code", "Invalid verification code"));
    }
    if req.password1.len() < 8 {
        return Err(ErrorResponse::field_error(
            "password1",
            "Password must be at least 8 characters",
        ));
    }
    if req.password1 != req.password2 {
        return Err(ErrorResponse::field_error(
            "password1",
            "Passwords do not match",
        ));
    }

    let service = auth_service(&state);
    let user = service
        .register(&req.email, &req.code, &req.password1)
        .await
        .map_err(|e| {
            tracing::warn!(email = %req.email, error = %e, "Registration failed");
            match e {
                AuthError::CodeNotSent => {
                    ErrorResponse::field_error("code", "Request a verification code first")
                }
                AuthError::CodeExpired => {
                    ErrorResponse::field_error("code", "Verification code expired, request a new one")
                }
                AuthError::CodeMismatch => {
                    ErrorResponse::field_error("code", "Verification code does not match")
                }
                AuthError::EmailTaken(_) => {
                    ErrorResponse::new("conflict", "Email already registered")
                }
                _ => ErrorResponse::new("internal_error", "Registration failed"),
            }
        })?;

    metrics::counter!("registrations_total").increment(1);
    Ok(CreatedResponse::new(RegisterResponse::from(user)))
}

/// Login endpoint: account may be a username or an email
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SuccessResponse<LoginResponse>>, ErrorResponse> {
    if req.account.is_empty() {
        return Err(ErrorResponse::field_error("account", "Account is required"));
    }
    if req.password.is_empty() {
        return Err(ErrorResponse::field_error("password", "Password is required"));
    }

    let jwt_service = JwtService::new(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_expiration_hours,
    );

    let service = auth_service(&state);
    let token = service.login(&req.account, &req.password).await.map_err(|e| {
        tracing::warn!(account = %req.account, error = %e, "Login failed");
        match e {
            // Unknown account and wrong password are indistinguishable on purpose
            AuthError::InvalidCredentials => {
                ErrorResponse::new("unauthorized", "Invalid account or password")
            }
            AuthError::AccountDisabled => {
                ErrorResponse::new("unauthorized", "Account is disabled")
            }
            _ => ErrorResponse::new("internal_error", "Authentication failed"),
        }
    })?;

    metrics::counter!("logins_total").increment(1);
    tracing::info!(account = %req.account, "User logged in");

    Ok(Json(SuccessResponse::new(LoginResponse {
        token,
        expires_at: jwt_service.expires_at(),
    })))
}

/// Refresh token endpoint: exchange a valid token for a fresh one
#[tracing::instrument(skip(state, req))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<SuccessResponse<LoginResponse>>, ErrorResponse> {
    if req.token.is_empty() {
        return Err(ErrorResponse::field_error("token", "Token is required"));
    }

    let jwt_service = JwtService::new(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_expiration_hours,
    );

    let claims = jwt_service.validate_token(&req.token).map_err(|e| {
        tracing::warn!(error = %e, "Token validation failed");
        match e {
            AuthError::TokenExpired => ErrorResponse::new("unauthorized", "Token has expired"),
            AuthError::InvalidToken(msg) => ErrorResponse::new("unauthorized", msg),
            _ => ErrorResponse::new("unauthorized", "Invalid token"),
        }
    })?;

    let user_id: i64 = claims.sub.parse().map_err(|_| {
        ErrorResponse::new("unauthorized", "Invalid token subject")
    })?;

    let new_token = jwt_service.encode_token(user_id, &claims.username).map_err(|e| {
        tracing::error!(error = %e, "Failed to generate new token");
        ErrorResponse::new("internal_error", "Failed to generate new token")
    })?;

    tracing::info!(user_id = %claims.sub, username = %claims.username, "Token refreshed");

    Ok(Json(SuccessResponse::new(LoginResponse {
        token: new_token,
        expires_at: jwt_service.expires_at(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{"account": "alice", "password": "secret123"}"#;
        let req: LoginRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.account, "alice");
        assert_eq!(req.password, "secret123");
    }

    #[test]
    fn test_login_response_serialization() {
        let response = LoginResponse {
            token: "test-token".to_string(),
            expires_at: 1234567890,
        };
        let json = serde_json::to_string(&response).expect("Failed to serialize");
        assert!(json.contains("test-token"));
        assert!(json.contains("1234567890"));
    }

    #[test]
    fn test_register_request_deserialization() {
        let json = r#"{
            "email": "new@example.com",
            "code": "123456",
            "password1": "password123",
            "password2": "password123"
        }"#;
        let req: RegisterRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.email, "new@example.com");
        assert_eq!(req.code, "123456");
        assert_eq!(req.password1, req.password2);
    }

    #[test]
    fn test_send_code_request_deserialization() {
        let json = r#"{"email": "new@example.com"}"#;
        let req: SendCodeRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.email, "new@example.com");
    }
}
