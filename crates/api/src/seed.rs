//! First-run seeding
//!
//! An empty user table would leave no admin to register anyone, so startup
//! creates a default account set when the store has no users at all. Any
//! existing user suppresses seeding entirely.

use sqlx::PgPool;

use crate::auth::password;
use crate::db::users::{self, Role};
use crate::error::ApiResult;

const SEED_PASSWORD: &str = "password123";

const SEED_USERS: [(&str, Role); 4] = [
    ("admin", Role::Admin),
    ("lead", Role::ProjectLead),
    ("dev1", Role::Developer),
    ("dev2", Role::Developer),
];

/// Create the default accounts if the store is empty.
pub async fn seed_if_empty(pool: &PgPool) -> ApiResult<()> {
    let existing = users::count(pool).await?;
    if existing > 0 {
        tracing::debug!(user_count = existing, "users present, skipping seed");
        return Ok(());
    }

    tracing::info!("no users found, seeding default accounts");

    for (username, role) in SEED_USERS {
        let hash = password::hash_password(SEED_PASSWORD)
            .map_err(crate::error::ApiError::internal)?;
        let user = users::insert(pool, username, &hash, role).await?;
        tracing::info!(username = %user.username, role = %role.as_str(), "seeded user");
    }

    tracing::warn!("default accounts use a well-known password; change them before exposing this deployment");

    Ok(())
}
