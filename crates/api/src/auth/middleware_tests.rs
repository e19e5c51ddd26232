//! Unit tests for authentication middleware
//!
//! Tests cover:
//! - Session token extraction from the Cookie header
//! - JWT validation through the middleware's state
//! - Error-to-response mapping for each rejection kind

#[cfg(test)]
#[allow(dead_code)]
mod tests {
    use super::super::jwt::{JwtManager, TokenError};
    use super::super::middleware::*;
    use super::super::session;
    use crate::db::users::Role;
    use axum::http::header::COOKIE;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    const TEST_SECRET: &str = "test-jwt-secret-key-for-testing-only";

    /// Setup test authentication state. The pool is lazy: nothing here
    /// touches the database, so no live server is needed.
    fn setup_auth_state() -> AuthState {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgresql://localhost/forgeboard_test")
            .expect("lazy pool construction should not fail");

        AuthState {
            jwt_manager: JwtManager::new(TEST_SECRET),
            pool,
        }
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn token_round_trips_through_cookie_and_manager() {
        let state = setup_auth_state();
        let user_id = Uuid::new_v4();

        let token = state.jwt_manager.issue(user_id, Role::Admin).unwrap();
        let headers = cookie_headers(&format!("forgeboard_session={token}"));

        let extracted = session::extract_session_token(&headers).unwrap();
        let claims = state.jwt_manager.verify(&extracted).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn unrelated_cookies_are_ignored() {
        let headers = cookie_headers("theme=dark; sidebar=collapsed");
        assert_eq!(session::extract_session_token(&headers), None);
    }

    #[test]
    fn token_from_another_deployment_is_rejected() {
        let state = setup_auth_state();
        let foreign = JwtManager::new("a-different-deployment-secret!!!");

        let token = foreign.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert_eq!(state.jwt_manager.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn missing_token_maps_to_unauthorized() {
        let response = AuthError::Token(TokenError::Missing).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_token_maps_to_unauthorized() {
        let response = AuthError::Token(TokenError::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn forbidden_maps_to_403() {
        let response = AuthError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn auth_user_carries_no_secrets() {
        // AuthUser is the projection handlers see; it must stay free of
        // hash/secret fields by construction.
        let user = AuthUser {
            id: Uuid::new_v4(),
            username: "lead".to_string(),
            role: Role::ProjectLead,
            mfa_enabled: true,
        };

        let debug = format!("{user:?}");
        assert!(!debug.contains("hash"));
        assert!(!debug.contains("secret"));
    }

    // Note: exercising require_auth/require_admin end-to-end needs a full
    // Axum server and a database; those paths are covered by the policy and
    // jwt unit tests plus the route wiring.
}
