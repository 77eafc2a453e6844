//! Authentication extractors for the JWT `token` cookie.
//!
//! Sessions are stateless: the cookie holds a signed JWT whose `sub` is the
//! user id. [`AuthSession`] only verifies the signature (no database hit);
//! [`RequireAdmin`] additionally loads the account and checks its role, so
//! a demoted or deleted admin loses access immediately.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use tunila_core::UserId;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::models::User;
use crate::services::auth::{AuthService, TOKEN_TTL_DAYS};
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "token";

const NOT_AUTHORIZED: &str = "Not authorized. Login again.";

/// Extractor for an authenticated caller.
///
/// Verifies the `token` cookie and yields the caller's id. Rejects with 401
/// when the cookie is missing, malformed, tampered, or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(session: AuthSession) -> impl IntoResponse {
///     format!("hello, user {}", session.user_id)
/// }
/// ```
pub struct AuthSession {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(parts)
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
        let user_id = auth.verify_token(&token)?;

        Ok(Self { user_id })
    }
}

/// Extractor for an authenticated admin.
///
/// Loads the account behind the token and rejects non-admins with 403.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;

        let user = UserRepository::new(state.pool())
            .get(session.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        if !user.role.is_admin() {
            return Err(AppError::Forbidden("Access denied. Admins only.".to_string()));
        }

        Ok(Self(user))
    }
}

/// Pull the session token out of the `Cookie` header(s).
fn token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE_NAME).then(|| value.to_string())
        })
}

/// Build the `Set-Cookie` value that establishes a session.
///
/// HttpOnly always; `Secure` only when the frontend is served over HTTPS
/// (i.e. everywhere except local development).
#[must_use]
pub fn session_cookie(token: &str, frontend_url: &str) -> String {
    let max_age = TOKEN_TTL_DAYS * 24 * 60 * 60;
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if frontend_url.starts_with("https://") {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the `Set-Cookie` value that clears the session.
#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let request = Request::builder()
            .uri("/api/songs")
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn test_token_extracted_from_cookie_header() {
        let parts = parts_with_cookie("token=abc.def.ghi");
        assert_eq!(token_from_headers(&parts), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_token_found_among_other_cookies() {
        let parts = parts_with_cookie("theme=dark; token=jwt-here; lang=np");
        assert_eq!(token_from_headers(&parts), Some("jwt-here".to_string()));
    }

    #[test]
    fn test_missing_token_cookie() {
        let parts = parts_with_cookie("theme=dark; lang=np");
        assert_eq!(token_from_headers(&parts), None);
    }

    #[test]
    fn test_similar_cookie_names_ignored() {
        let parts = parts_with_cookie("token2=nope; not_token=also-nope");
        assert_eq!(token_from_headers(&parts), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("jwt", "https://tunila.netlify.app");
        assert!(cookie.starts_with("token=jwt;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_session_cookie_not_secure_for_local_dev() {
        let cookie = session_cookie("jwt", "http://localhost:3000");
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.starts_with("token=;"));
    }
}
