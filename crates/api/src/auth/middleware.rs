//! Authentication middleware for Axum

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::users::{self, Role};

use super::jwt::{JwtManager, TokenError};
use super::session;

/// Authenticated caller, attached to the request after token verification.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub mfa_enabled: bool,
}

/// State needed to authenticate a request.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
    pub pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Not authorized for this action")]
    Forbidden,
    #[error("Database error")]
    Database,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::Token(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AuthError::Database => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Middleware that requires a valid session token.
///
/// Verifies the cookie-borne token and confirms the user still exists, then
/// attaches the fresh [`AuthUser`] projection. Role comes from the store,
/// not the token, so a role change takes effect on the next request rather
/// than at token expiry.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = match session::extract_session_token(request.headers()) {
        Some(token) => token,
        None => {
            tracing::warn!(path = %path, "request without session token");
            return AuthError::Token(TokenError::Missing).into_response();
        }
    };

    let claims = match auth_state.jwt_manager.verify(&token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "session token rejected");
            return AuthError::Token(err).into_response();
        }
    };

    let user = match users::find_by_id(&auth_state.pool, claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Token outlived the account.
            tracing::warn!(path = %path, user_id = %claims.sub, "token references missing user");
            return AuthError::Token(TokenError::Invalid).into_response();
        }
        Err(err) => {
            tracing::error!(path = %path, error = ?err, "user lookup failed during auth");
            return AuthError::Database.into_response();
        }
    };

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
        role: user.role,
        mfa_enabled: user.mfa_enabled,
    });
    next.run(request).await
}

/// Middleware that requires the admin role. Layered after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Response {
    let auth_user = request.extensions().get::<AuthUser>().cloned();

    match auth_user {
        Some(user) if user.role == Role::Admin => next.run(request).await,
        Some(user) => {
            tracing::warn!(
                user_id = %user.id,
                role = %user.role.as_str(),
                path = %request.uri().path(),
                "admin-only route denied"
            );
            AuthError::Forbidden.into_response()
        }
        None => AuthError::Token(TokenError::Missing).into_response(),
    }
}
