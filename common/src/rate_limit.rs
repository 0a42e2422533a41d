use crate::db::RedisPool;
use crate::errors::StorageError;
use rand::Rng;
use redis::AsyncCommands;

/// Sliding-window limiter for verification-code sends, backed by Redis
#[derive(Clone)]
pub struct CodeRateLimiter {
    redis: RedisPool,
}

impl CodeRateLimiter {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    /// Check whether a code may be sent to this address.
    ///
    /// Returns `Ok(true)` if the send is allowed, `Ok(false)` if another code
    /// was already sent inside the window.
    #[tracing::instrument(skip(self))]
    pub async fn check_send_allowed(
        &self,
        email: &str,
        max_sends: u32,
        window_seconds: u32,
    ) -> Result<bool, StorageError> {
        let mut conn = self.redis.get_connection();

        let key = format!("rate_limit:verify_code:{}", email);
        let now = chrono::Utc::now().timestamp();
        let window_start = now - window_seconds as i64;

        // Sorted set with send timestamps as scores; drop entries that
        // fell out of the window before counting
        let _: () = conn.zrembyscore(&key, 0, window_start).await?;

        let count: u32 = conn.zcard(&key).await?;

        if count >= max_sends {
            tracing::warn!(
                email = %email,
                count = count,
                max_sends = max_sends,
                "Verification code resend window not elapsed"
            );
            return Ok(false);
        }

        let member: u64 = rand::thread_rng().gen();
        let _: () = conn.zadd(&key, member, now).await?;

        // Expire the key once the window (plus a buffer) has passed
        let _: () = conn.expire(&key, (window_seconds + 60) as i64).await?;

        Ok(true)
    }

    /// Reset the window for an address (manual intervention or tests)
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, email: &str) -> Result<(), StorageError> {
        let mut conn = self.redis.get_connection();

        let key = format!("rate_limit:verify_code:{}", email);
        let _: () = conn.del(&key).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running Redis instance and are run with --ignored

    async fn test_limiter() -> CodeRateLimiter {
        let config = crate::config::RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
        };
        CodeRateLimiter::new(RedisPool::new(&config).await.unwrap())
    }

    #[tokio::test]
    #[ignore]
    async fn test_first_send_is_allowed() {
        let limiter = test_limiter().await;

        limiter.reset("first@example.com").await.unwrap();

        let allowed = limiter
            .check_send_allowed("first@example.com", 1, 60)
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    #[ignore]
    async fn test_second_send_inside_window_is_blocked() {
        let limiter = test_limiter().await;

        limiter.reset("burst@example.com").await.unwrap();

        assert!(limiter
            .check_send_allowed("burst@example.com", 1, 60)
            .await
            .unwrap());
        assert!(!limiter
            .check_send_allowed("burst@example.com", 1, 60)
            .await
            .unwrap());
    }

    #[tokio::test]
    #[ignore]
    async fn test_window_is_per_email() {
        let limiter = test_limiter().await;

        limiter.reset("a@example.com").await.unwrap();
        limiter.reset("b@example.com").await.unwrap();

        assert!(limiter
            .check_send_allowed("a@example.com", 1, 60)
            .await
            .unwrap());
        // A send to one address must not block another
        assert!(limiter
            .check_send_allowed("b@example.com", 1, 60)
            .await
            .unwrap());
    }

    #[tokio::test]
    #[ignore]
    async fn test_send_allowed_after_window() {
        let limiter = test_limiter().await;

        limiter.reset("patient@example.com").await.unwrap();

        assert!(limiter
            .check_send_allowed("patient@example.com", 1, 2)
            .await
            .unwrap());
        assert!(!limiter
            .check_send_allowed("patient@example.com", 1, 2)
            .await
            .unwrap());

        tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;

        assert!(limiter
            .check_send_allowed("patient@example.com", 1, 2)
            .await
            .unwrap());
    }
}
