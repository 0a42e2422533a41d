// Authentication: JWT token handling and the account service

use crate::db::repositories::user::UserRepository;
use crate::db::repositories::verify_code::VerifyCodeRepository;
use crate::errors::{AuthError, DatabaseError};
use crate::models::{Gender, NewUser, User, UserClaims};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use std::sync::Arc;
use tracing::{error, instrument};

/// JWT token service for encoding and decoding tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    expiration_hours: i64,
}

impl JwtService {
    /// Create a new JWT service with the given secret and expiration
    #[instrument(skip(secret))]
    pub fn new(secret: &str, expiration_hours: u64) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            expiration_hours: expiration_hours as i64,
        }
    }

    /// Encode user identity into a JWT token
    #[instrument(skip(self))]
    pub fn encode_token(&self, user_id: i64, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiration_hours)).timestamp();
        let iat = now.timestamp();

        let claims = UserClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp,
            iat,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to encode JWT token");
            AuthError::AuthenticationFailed(format!("Failed to encode token: {}", e))
        })
    }

    /// Decode and validate a JWT token
    #[instrument(skip(self, token))]
    pub fn decode_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data =
            decode::<UserClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(format!("Token validation failed: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Validate a token and return claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        self.decode_token(token)
    }

    /// Expiration timestamp a token issued right now would carry
    pub fn expires_at(&self) -> i64 {
        (Utc::now() + Duration::hours(self.expiration_hours)).timestamp()
    }
}

/// Generate a numeric verification code of the given length
pub fn generate_verification_code(length: u32) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Account service: credential checks, registration and password changes
#[derive(Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    user_repository: Arc<UserRepository>,
    verify_code_repository: Arc<VerifyCodeRepository>,
    code_ttl_minutes: i64,
}

impl AuthService {
    pub fn new(
        jwt_service: JwtService,
        user_repository: UserRepository,
        verify_code_repository: VerifyCodeRepository,
        code_ttl_minutes: i64,
    ) -> Self {
        Self {
            jwt_service,
            user_repository: Arc::new(user_repository),
            verify_code_repository: Arc::new(verify_code_repository),
            code_ttl_minutes,
        }
    }

    /// Authenticate a user; the account field matches either username or email
    #[instrument(skip(self, password))]
    pub async fn login(&self, account: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .user_repository
            .find_by_account(account)
            .await
            .map_err(|e| {
                error!(error = %e, account = %account, "Database error during login");
                AuthError::AuthenticationFailed(format!("Database error: {}", e))
            })?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let password_valid = bcrypt::verify(password, &user.password_hash).map_err(|e| {
            error!(error = %e, "Failed to verify password");
            AuthError::AuthenticationFailed(format!("Password verification failed: {}", e))
        })?;

        if !password_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.jwt_service.encode_token(user.id, &user.username)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
        Ok(token)
    }

    /// Register an account after validating the emailed verification code.
    /// The username starts out as the email address.
    #[instrument(skip(self, code, password))]
    pub async fn register(
        &self,
        email: &str,
        code: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let stored = self
            .verify_code_repository
            .find_latest_by_email(email)
            .await
            .map_err(|e| {
                error!(error = %e, email = %email, "Database error during registration");
                AuthError::AuthenticationFailed(format!("Database error: {}", e))
            })?
            .ok_or(AuthError::CodeNotSent)?;

        let expires_at = stored.created_at + Duration::minutes(self.code_ttl_minutes);
        if Utc::now() > expires_at {
            return Err(AuthError::CodeExpired);
        }
        if stored.code != code {
            return Err(AuthError::CodeMismatch);
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::AuthenticationFailed(format!("Password hashing failed: {}", e))
        })?;

        let new_user = NewUser {
            username: email.to_string(),
            email: email.to_string(),
            password_hash,
            gender: Gender::default(),
        };

        let user = self.user_repository.create(&new_user).await.map_err(|e| {
            error!(error = %e, email = %email, "Failed to create user");
            match e {
                DatabaseError::DuplicateKey(_) => AuthError::EmailTaken(email.to_string()),
                _ => AuthError::AuthenticationFailed(format!("Failed to create user: {}", e)),
            }
        })?;

        // Consumed codes are no longer valid for this address
        if let Err(e) = self.verify_code_repository.delete_by_email(email).await {
            tracing::warn!(error = %e, email = %email, "Failed to clear used verification codes");
        }

        tracing::info!(user_id = %user.id, email = %email, "User registered");
        Ok(user)
    }

    /// Change a user's password after verifying the current one
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Database error");
                AuthError::AuthenticationFailed(format!("Database error: {}", e))
            })?
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;

        let old_valid = bcrypt::verify(old_password, &user.password_hash).map_err(|e| {
            error!(error = %e, "Failed to verify password");
            AuthError::AuthenticationFailed(format!("Password verification failed: {}", e))
        })?;
        if !old_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::AuthenticationFailed(format!("Password hashing failed: {}", e))
        })?;

        self.user_repository
            .update_password(user_id, &password_hash)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to update password");
                AuthError::AuthenticationFailed(format!("Failed to update password: {}", e))
            })?;

        tracing::info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    /// Validate a JWT token and return claims
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        self.jwt_service.validate_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_service_encode_decode() {
        let service = JwtService::new("test-secret", 24);

        let token = service
            .encode_token(123, "testuser")
            .expect("Failed to encode token");

        let claims = service.decode_token(&token).expect("Failed to decode token");

        assert_eq!(claims.sub, "123");
        assert_eq!(claims.username, "testuser");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jwt_service_expired_token() {
        let service = JwtService::new("test-secret", 1);

        // Manually build a token that expired an hour ago
        let now = Utc::now();
        let claims = UserClaims {
            sub: "123".to_string(),
            username: "testuser".to_string(),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };

        let encoding_key = EncodingKey::from_secret("test-secret".as_bytes());
        let token =
            encode(&Header::default(), &claims, &encoding_key).expect("Failed to encode token");

        let result = service.decode_token(&token);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_jwt_service_invalid_token() {
        let service = JwtService::new("test-secret", 24);
        let result = service.decode_token("invalid.token.here");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_jwt_service_rejects_wrong_secret() {
        let issuer = JwtService::new("secret-a", 24);
        let verifier = JwtService::new("secret-b", 24);

        let token = issuer
            .encode_token(7, "alice")
            .expect("Failed to encode token");
        assert!(verifier.decode_token(&token).is_err());
    }

    #[test]
    fn test_generate_verification_code_shape() {
        for _ in 0..50 {
            let code = generate_verification_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_verification_code_respects_length() {
        assert_eq!(generate_verification_code(4).len(), 4);
        assert_eq!(generate_verification_code(8).len(), 8);
    }
}
