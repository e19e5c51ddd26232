//! Login flow
//!
//! Credentials first, MFA second, token last. The password is verified even
//! when an MFA code arrives in the same request — a caller is never trusted
//! to have passed step one earlier. Failures at the credential step share
//! one message so responses cannot be used to probe which usernames exist;
//! once the password has checked out, the MFA step may be specific.

use sqlx::PgPool;

use crate::db::users::{self, Role};
use crate::error::{ApiError, ApiResult};

use super::{password, totp};

/// Uniform credential-step failure message (anti-enumeration).
pub const BAD_CREDENTIALS: &str = "Invalid username or password";

/// MFA-step failure message. The username is already confirmed at this
/// point, so being specific leaks nothing new.
pub const BAD_MFA_CODE: &str = "Invalid MFA token";

/// A fully authenticated identity, ready for token issuance.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: uuid::Uuid,
    pub username: String,
    pub role: Role,
    pub mfa_enabled: bool,
}

/// Outcome of a login attempt that did not fail outright.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Password checked out but the account has MFA enabled and no code was
    /// supplied. Deliberately not an authenticated state: no token may be
    /// issued for it.
    MfaRequired,
    Authenticated(AuthenticatedUser),
}

/// Run the login state machine against the credential store.
pub async fn login(
    pool: &PgPool,
    username: &str,
    password_input: &str,
    mfa_code: Option<&str>,
) -> ApiResult<LoginOutcome> {
    let Some(creds) = users::find_credentials_by_username(pool, username).await? else {
        // Unknown username gets the same answer as a wrong password.
        return Err(ApiError::Authentication(BAD_CREDENTIALS.to_string()));
    };

    let password_ok = password::verify_password(password_input, &creds.password_hash)
        .map_err(ApiError::internal)?;
    if !password_ok {
        return Err(ApiError::Authentication(BAD_CREDENTIALS.to_string()));
    }

    if let Some(secret) = creds.mfa_secret.as_deref() {
        let Some(code) = mfa_code else {
            return Ok(LoginOutcome::MfaRequired);
        };

        let code_ok =
            totp::verify_code(secret, code, &creds.username).map_err(ApiError::internal)?;
        if !code_ok {
            return Err(ApiError::Authentication(BAD_MFA_CODE.to_string()));
        }
    }

    Ok(LoginOutcome::Authenticated(AuthenticatedUser {
        id: creds.id,
        username: creds.username,
        role: creds.role,
        mfa_enabled: creds.mfa_secret.is_some(),
    }))
}

/// Trim and length-check a registration username.
pub fn validate_username(raw: &str) -> Result<String, ApiError> {
    let username = raw.trim();
    if username.len() < 3 || username.len() > 30 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 30 characters".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Length-check a new password.
pub fn validate_new_password(plaintext: &str) -> Result<(), ApiError> {
    if !password::meets_length_requirement(plaintext) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }
    Ok(())
}
