//! Shared infrastructure for Forgeboard services
//!
//! Holds the pieces that are not specific to any one binary: database pool
//! construction, the migrations runner, and the in-memory rate limiter used
//! to throttle credential-guessing on the auth endpoints.

pub mod db;
pub mod rate_limit;

pub use db::{create_pool, run_migrations};
pub use rate_limit::RateLimiter;
