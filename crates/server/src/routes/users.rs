//! User route handlers: own data, public profiles, profile media, admin list.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use tunila_core::UserId;

use crate::db::playlists::PlaylistRepository;
use crate::db::songs::SongRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthSession, RequireAdmin};
use crate::models::{PlaylistWithSongs, Song, User};
use crate::services::uploads::MediaKind;
use crate::state::AppState;

/// A public profile: account fields plus songs and public playlists.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub songs: Vec<Song>,
    pub playlists: Vec<PlaylistWithSongs>,
}

/// The logged-in user's own account.
///
/// GET /api/user/data
#[instrument(skip(state, session))]
pub async fn get_data(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .get(session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "userData": user })))
}

/// A public profile page.
///
/// GET /api/user/profile/{user_id}
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let songs = SongRepository::new(state.pool())
        .list_by_artist(user_id)
        .await?;
    let playlists = PlaylistRepository::new(state.pool())
        .list_public_by_owner_with_songs(user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "userProfile": UserProfile { user, songs, playlists },
    })))
}

/// Update the cover image and/or profile picture.
///
/// PUT /api/user/profile (multipart: `coverImage`, `profilePicture`)
#[instrument(skip(state, session, multipart))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut cover_path: Option<String> = None;
    let mut picture_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "coverImage" => {
                let file_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                cover_path = Some(
                    state
                        .uploads()
                        .save(MediaKind::UserCover, file_name.as_deref(), bytes)
                        .await?,
                );
            }
            "profilePicture" => {
                let file_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                picture_path = Some(
                    state
                        .uploads()
                        .save(MediaKind::ProfilePicture, file_name.as_deref(), bytes)
                        .await?,
                );
            }
            _ => {}
        }
    }

    let user = UserRepository::new(state.pool())
        .update_profile_images(session.user_id, cover_path.as_deref(), picture_path.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "userProfile": user,
    })))
}

/// Every account.
///
/// GET /api/user/all-users (admin)
#[instrument(skip(state, _admin))]
pub async fn all_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

/// Remove an account.
///
/// DELETE /api/user/delete/{user_id} (admin)
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
