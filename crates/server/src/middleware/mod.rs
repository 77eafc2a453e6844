//! Request middleware: authentication extractors and rate limiting.

pub mod auth;
pub mod rate_limit;

pub use auth::{AuthSession, RequireAdmin, clear_session_cookie, session_cookie};
pub use rate_limit::auth_rate_limiter;
