use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use common::config::Settings;
use common::db::{DbPool, RedisPool};
use common::mailer::Mailer;
use common::pagination::Paginator;
use common::rate_limit::CodeRateLimiter;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub redis_pool: RedisPool,
    pub mailer: Mailer,
    pub metrics_handle: PrometheusHandle,
    pub config: Arc<Settings>,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(
        db_pool: DbPool,
        redis_pool: RedisPool,
        metrics_handle: PrometheusHandle,
        config: Settings,
    ) -> Self {
        let mailer = Mailer::new(&config.email);

        Self {
            db_pool,
            redis_pool,
            mailer,
            metrics_handle,
            config: Arc::new(config),
        }
    }

    /// Paginator configured with the service-wide page size
    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.config.pagination.max_per_page)
    }

    /// Rate limiter for verification-code sends
    pub fn code_rate_limiter(&self) -> CodeRateLimiter {
        CodeRateLimiter::new(self.redis_pool.clone())
    }
}
