use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// User Models
// ============================================================================

/// Gender stored as a lowercase string column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Male
    }
}

/// A registered account with its public profile fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: Gender,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub following_count: i32,
    pub follower_count: i32,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a user; the id comes from the database
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub gender: Gender,
}

/// JWT claims carried by every authenticated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User id, stringified
    pub sub: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// One emailed verification code; the newest row per email wins
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailVerifyCode {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Content Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub post_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub category_id: i64,
    pub content: String,
    pub like_count: i32,
    pub read_count: i32,
    pub comment_count: i32,
    pub is_excellent: bool,
    pub is_hot: bool,
    pub is_top: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub author_id: i64,
    pub category_id: i64,
    pub content: String,
}

/// A post joined with its author's username for listings and details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub author_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_serialization_is_lowercase() {
        let json = serde_json::to_string(&Gender::Female).expect("Failed to serialize");
        assert_eq!(json, "\"female\"");
        let parsed: Gender = serde_json::from_str("\"male\"").expect("Failed to deserialize");
        assert_eq!(parsed, Gender::Male);
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            gender: Gender::default(),
            avatar: None,
            address: None,
            bio: None,
            birthday: None,
            following_count: 0,
            follower_count: 0,
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).expect("Failed to serialize");
        assert!(!json.contains("password_hash"));
        assert!(json.contains("alice@example.com"));
    }

    #[test]
    fn test_post_with_author_flattens_post_fields() {
        let now = Utc::now();
        let post = PostWithAuthor {
            post: Post {
                id: 9,
                title: "Hello".to_string(),
                author_id: 1,
                category_id: 2,
                content: "body".to_string(),
                like_count: 0,
                read_count: 3,
                comment_count: 0,
                is_excellent: false,
                is_hot: false,
                is_top: true,
                created_at: now,
                updated_at: now,
            },
            author_username: "alice".to_string(),
        };

        let value = serde_json::to_value(&post).expect("Failed to serialize");
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["author_username"], "alice");
        assert_eq!(value["is_top"], true);
    }
}
