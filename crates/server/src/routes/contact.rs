//! Support inbox route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use tunila_core::{ContactMessageId, UserId};

use crate::db::contacts::ContactRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Present when the submitter was logged in.
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    #[serde(default)]
    pub reply_message: String,
}

/// Submit a support message. Public.
///
/// POST /api/contact/submit
#[instrument(skip(state, req), fields(subject = %req.subject))]
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse> {
    if req.name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.subject.trim().is_empty()
        || req.message.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Name, email, subject and message are required".to_string(),
        ));
    }

    ContactRepository::new(state.pool())
        .create(
            req.user_id,
            req.name.trim(),
            req.email.trim(),
            req.subject.trim(),
            req.message.trim(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Your message has been sent successfully!",
        })),
    ))
}

/// The whole inbox.
///
/// GET /api/contact/messages (admin)
#[instrument(skip(state, _admin))]
pub async fn messages(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse> {
    let messages = ContactRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

/// Email a reply to the submitter, then record it.
///
/// POST /api/contact/reply/{message_id} (admin)
///
/// The email goes first: if it can't be sent, nothing is recorded and the
/// admin sees the failure instead of a silently unanswered user.
#[instrument(skip(state, _admin, req))]
pub async fn reply(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(message_id): Path<ContactMessageId>,
    Json(req): Json<ReplyRequest>,
) -> Result<impl IntoResponse> {
    if req.reply_message.trim().is_empty() {
        return Err(AppError::BadRequest("Reply message is required".to_string()));
    }

    let contacts = ContactRepository::new(state.pool());
    let message = contacts
        .get(message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    state
        .email()
        .send_contact_reply(
            &message.email,
            &message.name,
            &message.subject,
            &message.message,
            req.reply_message.trim(),
        )
        .await?;

    contacts.set_reply(message_id, req.reply_message.trim()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Reply sent successfully",
    })))
}
