//! Credential store queries
//!
//! The default projection (`User`) never includes the password hash or the
//! MFA secret. Paths that genuinely need secrets — login, password change,
//! MFA verification — fetch `Credentials` explicitly.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Coarse-grained permission tier. Exactly one per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProjectLead,
    Developer,
}

impl Role {
    /// Parse a client-supplied role name, rejecting anything outside the
    /// enumerated set.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "admin" => Ok(Self::Admin),
            "project_lead" => Ok(Self::ProjectLead),
            "developer" => Ok(Self::Developer),
            _ => Err(ApiError::Validation("Invalid role specified".to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::ProjectLead => "project_lead",
            Self::Developer => "developer",
        }
    }
}

/// Default read projection of a user. No secrets.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    #[serde(rename = "mfaEnabled")]
    pub mfa_enabled: bool,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
}

/// Full credential record, fetched only where secrets are verified.
#[derive(Debug, FromRow)]
pub struct Credentials {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub mfa_secret: Option<String>,
}

const USER_COLUMNS: &str =
    "id, username, role, mfa_secret IS NOT NULL AS mfa_enabled, created_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_credentials_by_username(
    pool: &PgPool,
    username: &str,
) -> ApiResult<Option<Credentials>> {
    let creds = sqlx::query_as::<_, Credentials>(
        "SELECT id, username, password_hash, role, mfa_secret FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(creds)
}

pub async fn find_credentials_by_id(pool: &PgPool, id: Uuid) -> ApiResult<Option<Credentials>> {
    let creds = sqlx::query_as::<_, Credentials>(
        "SELECT id, username, password_hash, role, mfa_secret FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(creds)
}

pub async fn list_all(pool: &PgPool) -> ApiResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub async fn count(pool: &PgPool) -> ApiResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Insert a new user. The caller supplies an already-hashed password;
/// plaintext never reaches this layer. Username uniqueness rides on the
/// unique constraint so concurrent registrations cannot race past the check.
pub async fn insert(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    role: Role,
) -> ApiResult<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password_hash, role) \
         VALUES ($1, $2, $3) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(map_duplicate_username)?;

    Ok(user)
}

/// Replace the stored hash. Only the password column changes; role and MFA
/// state are untouched, so no other write path can double-hash.
pub async fn update_password(pool: &PgPool, id: Uuid, password_hash: &str) -> ApiResult<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn update_role(pool: &PgPool, id: Uuid, role: Role) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Write or clear the MFA secret. A single-row update; the store's own
/// atomicity is the only guard two concurrent enables need.
pub async fn set_mfa_secret(pool: &PgPool, id: Uuid, secret: Option<&str>) -> ApiResult<()> {
    sqlx::query("UPDATE users SET mfa_secret = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(secret)
        .execute(pool)
        .await?;

    Ok(())
}

fn map_duplicate_username(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return ApiError::Validation("User already exists".to_string());
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_enumerated_values() {
        assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
        assert_eq!(Role::parse("project_lead").unwrap(), Role::ProjectLead);
        assert_eq!(Role::parse("developer").unwrap(), Role::Developer);
    }

    #[test]
    fn role_rejects_unknown_values() {
        for raw in ["superuser", "ADMIN", "", "project lead"] {
            assert!(
                matches!(Role::parse(raw), Err(ApiError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::ProjectLead, Role::Developer] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn user_serialization_omits_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            username: "dev1".to_string(),
            role: Role::Developer,
            mfa_enabled: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("mfa_secret").is_none());
        assert_eq!(json["mfaEnabled"], false);
        assert_eq!(json["role"], "developer");
    }
}
