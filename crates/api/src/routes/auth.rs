//! Authentication endpoints
//!
//! Thin HTTP shells over `auth::flow`, the TOTP engine, and the credential
//! store. Request bodies are explicit structs; nothing dynamic reaches the
//! business logic.

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::flow::{self, LoginOutcome};
use crate::auth::middleware::{require_admin, require_auth, AuthState, AuthUser};
use crate::auth::{password, session, totp};
use crate::db::users::{self, Role, User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router(state: AppState, auth_state: AuthState) -> Router {
    let public = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout));

    let protected = Router::new()
        .route("/me", get(me))
        .route("/mfa/setup", get(mfa_setup))
        .route("/mfa/enable", post(mfa_enable))
        .route("/mfa/disable", post(mfa_disable))
        .route("/password/update", post(update_password))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ));

    let admin = Router::new()
        .route("/register", post(register))
        .route("/users", get(list_users))
        .route("/users/{id}/role", patch(update_role))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    public.merge(protected).merge(admin).with_state(state)
}

/// Public profile fields. Never the hash, never the MFA secret.
#[derive(Debug, Serialize)]
struct Profile {
    id: Uuid,
    username: String,
    role: Role,
    #[serde(rename = "mfaEnabled")]
    mfa_enabled: bool,
}

impl From<&AuthUser> for Profile {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            mfa_enabled: user.mfa_enabled,
        }
    }
}

/// Reduced listing shape for admin user management.
#[derive(Debug, Serialize)]
struct UserSummary {
    id: Uuid,
    username: String,
    role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
    #[serde(rename = "mfaToken")]
    mfa_token: Option<String>,
}

/// Best-effort client address for rate limiting, taken from proxy headers.
fn client_key(headers: &HeaderMap) -> String {
    if let Some(xff) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            return first.trim().to_string();
        }
    }
    if let Some(ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return ip.to_string();
    }
    "unknown".to_string()
}

fn rate_limited_response() -> Response {
    let body = Json(json!({
        "error": "Too many login attempts, please try again later.",
        "code": 429
    }));
    (StatusCode::TOO_MANY_REQUESTS, body).into_response()
}

fn set_session_cookie(response: &mut Response, cookie: &str) -> ApiResult<()> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| ApiError::Internal("invalid cookie value".to_string()))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    if !state.auth_limiter.check(&client_key(&headers)).await {
        return Ok(rate_limited_response());
    }

    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let outcome = flow::login(
        &state.pool,
        body.username.trim(),
        &body.password,
        body.mfa_token.as_deref(),
    )
    .await?;

    match outcome {
        LoginOutcome::MfaRequired => {
            // Intermediate, non-authenticated response: no cookie is set.
            Ok(Json(json!({
                "requiresMFA": true,
                "message": "MFA token required"
            }))
            .into_response())
        }
        LoginOutcome::Authenticated(user) => {
            let token = state
                .jwt_manager
                .issue(user.id, user.role)
                .map_err(ApiError::internal)?;

            tracing::info!(user_id = %user.id, "login successful");

            let mut response = Json(Profile {
                id: user.id,
                username: user.username,
                role: user.role,
                mfa_enabled: user.mfa_enabled,
            })
            .into_response();
            set_session_cookie(
                &mut response,
                &session::session_cookie(&token, state.secure_cookies()),
            )?;
            Ok(response)
        }
    }
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let mut response = Json(json!({ "message": "Logged out successfully" })).into_response();
    set_session_cookie(
        &mut response,
        &session::clear_session_cookie(state.secure_cookies()),
    )?;
    Ok(response)
}

/// GET /api/auth/me
async fn me(Extension(user): Extension<AuthUser>) -> Json<Profile> {
    Json(Profile::from(&user))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    role: Option<String>,
}

/// POST /api/auth/register (admin only)
///
/// Creates the account and returns it. The caller's session is untouched:
/// an admin registering someone must not be logged out of their own
/// session, and the new user authenticates themselves later.
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<Response> {
    if !state.auth_limiter.check(&client_key(&headers)).await {
        return Ok(rate_limited_response());
    }

    let username = flow::validate_username(&body.username)?;
    flow::validate_new_password(&body.password)?;
    let role = match body.role.as_deref() {
        Some(raw) => Role::parse(raw)?,
        None => Role::Developer,
    };

    let hash = password::hash_password(&body.password).map_err(ApiError::internal)?;
    let user = users::insert(&state.pool, &username, &hash, role).await?;

    tracing::info!(user_id = %user.id, username = %user.username, role = %role.as_str(), "user registered");

    Ok((StatusCode::CREATED, Json(UserSummary::from(user))).into_response())
}

/// GET /api/auth/mfa/setup
///
/// Generates a candidate secret and its provisioning QR code. Nothing is
/// persisted yet: the secret only becomes active once the enable endpoint
/// sees a valid code for it.
async fn mfa_setup(
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let secret = totp::generate_secret();
    let uri = totp::provisioning_uri(&secret, &user.username).map_err(ApiError::internal)?;
    let png = totp::render_qr_png(&uri).map_err(ApiError::internal)?;

    Ok(Json(json!({
        "secret": secret,
        "provisioningImage": format!("data:image/png;base64,{}", BASE64.encode(png)),
        "manualEntryKey": secret,
    })))
}

#[derive(Debug, Deserialize)]
struct EnableMfaRequest {
    secret: String,
    token: String,
}

/// POST /api/auth/mfa/enable
///
/// The submitted code must verify against the candidate secret before the
/// secret is written; a failed attempt leaves the account without MFA.
async fn mfa_enable(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<EnableMfaRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.secret.is_empty() {
        return Err(ApiError::Validation("MFA secret is required".to_string()));
    }

    let verified = totp::verify_code(&body.secret, &body.token, &user.username)
        .map_err(ApiError::internal)?;
    if !verified {
        return Err(ApiError::Validation(
            "Invalid MFA token. Please try again.".to_string(),
        ));
    }

    users::set_mfa_secret(&state.pool, user.id, Some(&body.secret)).await?;
    tracing::info!(user_id = %user.id, "MFA enabled");

    Ok(Json(json!({ "message": "MFA enabled successfully" })))
}

/// POST /api/auth/mfa/disable
///
/// Unconditional: turning MFA off lowers the account's security posture, so
/// no re-verification is demanded.
async fn mfa_disable(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<serde_json::Value>> {
    users::set_mfa_secret(&state.pool, user.id, None).await?;
    tracing::info!(user_id = %user.id, "MFA disabled");

    Ok(Json(json!({ "message": "MFA disabled successfully" })))
}

#[derive(Debug, Deserialize)]
struct UpdatePasswordRequest {
    #[serde(rename = "currentPassword")]
    current_password: String,
    #[serde(rename = "newPassword")]
    new_password: String,
}

/// POST /api/auth/password/update
async fn update_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let creds = users::find_credentials_by_id(&state.pool, user.id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let current_ok = password::verify_password(&body.current_password, &creds.password_hash)
        .map_err(ApiError::internal)?;
    if !current_ok {
        return Err(ApiError::Authentication(
            "Current password is incorrect".to_string(),
        ));
    }

    flow::validate_new_password(&body.new_password)?;

    let hash = password::hash_password(&body.new_password).map_err(ApiError::internal)?;
    users::update_password(&state.pool, user.id, &hash).await?;
    tracing::info!(user_id = %user.id, "password updated");

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// GET /api/auth/users (admin only)
async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = users::list_all(&state.pool).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

#[derive(Debug, Deserialize)]
struct UpdateRoleRequest {
    role: String,
}

/// PATCH /api/auth/users/{id}/role (admin only)
async fn update_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> ApiResult<Json<UserSummary>> {
    let role = Role::parse(&body.role)?;

    let user = users::update_role(&state.pool, user_id, role)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    tracing::info!(user_id = %user.id, role = %role.as_str(), "role updated");

    Ok(Json(UserSummary::from(user)))
}
