//! Session cookie handling
//!
//! The signed token travels in an HTTP-only, SameSite=Strict cookie so
//! client script can neither read nor forge it. `Secure` is added outside
//! local development.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use super::jwt::SESSION_TTL_DAYS;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "forgeboard_session";

const SESSION_MAX_AGE_SECS: i64 = SESSION_TTL_DAYS * 24 * 60 * 60;

/// Build the Set-Cookie value for a fresh session.
pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Strict{}",
        secure_suffix(secure)
    )
}

/// Build the Set-Cookie value that clears the session.
///
/// Overwrites the cookie with an already-expired empty value. Tokens issued
/// earlier remain valid until natural expiry (stateless tokens, documented
/// non-goal).
pub fn clear_session_cookie(secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict{}",
        secure_suffix(secure)
    )
}

fn secure_suffix(secure: bool) -> &'static str {
    if secure {
        "; Secure"
    } else {
        ""
    }
}

/// Pull the session token out of the request's Cookie header, if present.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            for cookie in cookies.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("forgeboard_session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
            None
        })
}
