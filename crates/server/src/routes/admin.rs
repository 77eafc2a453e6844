//! Admin moderation route handlers.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::instrument;

use tunila_core::{SongId, UserId};

use crate::db::songs::SongRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAdmin;
use crate::state::AppState;

/// Every account.
///
/// GET /api/admin/users
#[instrument(skip(state, _admin))]
pub async fn all_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

/// Every song.
///
/// GET /api/admin/songs
#[instrument(skip(state, _admin))]
pub async fn all_songs(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse> {
    let songs = SongRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "songs": songs })))
}

/// Remove an account.
///
/// DELETE /api/admin/users/{user_id}
#[instrument(skip(state, _admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let deleted = UserRepository::new(state.pool()).delete(user_id).await?;
    if !deleted {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}

/// Remove a song.
///
/// DELETE /api/admin/songs/{song_id}
#[instrument(skip(state, _admin))]
pub async fn delete_song(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(song_id): Path<SongId>,
) -> Result<impl IntoResponse> {
    let deleted = SongRepository::new(state.pool()).delete(song_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Song not found".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Song deleted successfully",
    })))
}

/// Deactivate an account and notify its owner.
///
/// PUT /api/admin/users/deactivate/{user_id}
#[instrument(skip(state, _admin))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let user = set_active(&state, user_id, false).await?;

    if let Err(e) = state
        .email()
        .send_deactivation_notice(user.email.as_str(), &user.name)
        .await
    {
        tracing::warn!(error = %e, user = %user.id, "deactivation notice failed");
    }

    Ok(Json(json!({
        "success": true,
        "message": "User deactivated",
    })))
}

/// Reactivate an account and notify its owner.
///
/// PUT /api/admin/users/reactivate/{user_id}
#[instrument(skip(state, _admin))]
pub async fn reactivate_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let user = set_active(&state, user_id, true).await?;

    if let Err(e) = state
        .email()
        .send_reactivation_notice(user.email.as_str(), &user.name)
        .await
    {
        tracing::warn!(error = %e, user = %user.id, "reactivation notice failed");
    }

    Ok(Json(json!({
        "success": true,
        "message": "User reactivated",
    })))
}

async fn set_active(
    state: &AppState,
    user_id: UserId,
    is_active: bool,
) -> Result<crate::models::User> {
    UserRepository::new(state.pool())
        .set_active(user_id, is_active)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("User not found".to_string())
            }
            other => AppError::Database(other),
        })
}
