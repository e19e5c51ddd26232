//! Application state

use std::time::Duration;

use sqlx::PgPool;

use forgeboard_shared::RateLimiter;

use crate::auth::{AuthState, JwtManager};
use crate::config::Config;

/// Login/register attempts allowed per client per window.
const AUTH_RATE_LIMIT: u32 = 5;
const AUTH_RATE_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    /// Throttles credential-guessing on the login/register endpoints.
    pub auth_limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret);

        let auth_limiter = RateLimiter::new_in_memory(AUTH_RATE_LIMIT, AUTH_RATE_WINDOW);
        tracing::info!(
            max_requests = AUTH_RATE_LIMIT,
            window_secs = AUTH_RATE_WINDOW.as_secs(),
            "auth rate limiter initialized"
        );

        Self {
            pool,
            config,
            jwt_manager,
            auth_limiter,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
            pool: self.pool.clone(),
        }
    }

    /// Whether session cookies should carry the `Secure` flag.
    pub fn secure_cookies(&self) -> bool {
        self.config.environment.secure_cookies()
    }
}
