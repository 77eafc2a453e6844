//! Auth route handlers: registration, login, OTP flows.

use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::auth::{AuthSession, clear_session_cookie, session_cookie};
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub new_password: String,
}

/// Create an account and start a session.
///
/// POST /api/auth/register
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    if req.name.trim().is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(crate::error::AppError::BadRequest("Missing details".to_string()));
    }

    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let user = auth.register(req.name.trim(), &req.email, &req.password).await?;
    let token = auth.issue_token(user.id)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    // Best effort; a mail hiccup shouldn't lose the registration
    if let Err(e) = state
        .email()
        .send_welcome(user.email.as_str(), &user.name)
        .await
    {
        tracing::warn!(error = %e, user = %user.id, "welcome email failed");
    }

    Ok(session_response(&state, token, user))
}

/// Login and start a session.
///
/// POST /api/auth/login
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(crate::error::AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let user = auth.login(&req.email, &req.password).await?;
    let token = auth.issue_token(user.id)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(session_response(&state, token, user))
}

/// End the session.
///
/// POST /api/auth/logout
pub async fn logout() -> impl IntoResponse {
    clear_sentry_user();

    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
}

/// Email a verification OTP to the logged-in user.
///
/// POST /api/auth/send-verify-otp
#[instrument(skip(state, session))]
pub async fn send_verify_otp(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let (user, otp) = auth.start_email_verification(session.user_id).await?;

    state
        .email()
        .send_verify_otp(user.email.as_str(), &otp)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Verification OTP sent to your email",
    })))
}

/// Confirm the verification OTP.
///
/// POST /api/auth/verify-account
#[instrument(skip(state, session, req))]
pub async fn verify_account(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<OtpRequest>,
) -> Result<impl IntoResponse> {
    if req.otp.is_empty() {
        return Err(crate::error::AppError::BadRequest("Missing details".to_string()));
    }

    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    auth.confirm_email_verification(session.user_id, &req.otp)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Account verified",
    })))
}

/// Cheap session probe.
///
/// GET /api/auth/is-auth
pub async fn is_auth(_session: AuthSession) -> impl IntoResponse {
    Json(json!({ "success": true }))
}

/// Email a password reset OTP.
///
/// Always claims success so the endpoint can't be used to enumerate
/// registered addresses.
///
/// POST /api/auth/send-reset-otp
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn send_reset_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<impl IntoResponse> {
    if req.email.is_empty() {
        return Err(crate::error::AppError::BadRequest("Email is required".to_string()));
    }

    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    if let Some((user, otp)) = auth.start_password_reset(&req.email).await? {
        state
            .email()
            .send_reset_otp(user.email.as_str(), &otp)
            .await?;
    }

    Ok(Json(json!({
        "success": true,
        "message": "If that email is registered, a reset code is on its way",
    })))
}

/// Reset the password with the emailed OTP.
///
/// POST /api/auth/reset-password
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse> {
    if req.email.is_empty() || req.otp.is_empty() || req.new_password.is_empty() {
        return Err(crate::error::AppError::BadRequest("Missing details".to_string()));
    }

    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    auth.reset_password(&req.email, &req.otp, &req.new_password)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password has been reset",
    })))
}

/// Session cookie + user envelope shared by register and login.
fn session_response(state: &AppState, token: String, user: User) -> impl IntoResponse + use<> {
    let cookie = session_cookie(&token, &state.config().frontend_url);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "userData": user })),
    )
}
