//! Playlist route handlers.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use tunila_core::{PlaylistId, SongId};

use crate::db::playlists::PlaylistRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::Playlist;
use crate::services::uploads::{DEFAULT_PLAYLIST_COVER, MediaKind};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSongsRequest {
    #[serde(default)]
    pub song_ids: Vec<SongId>,
}

/// All public playlists with songs.
///
/// GET /api/playlists/public
#[instrument(skip(state))]
pub async fn public(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let playlists = PlaylistRepository::new(state.pool())
        .list_public_with_songs()
        .await?;

    Ok(Json(json!({ "success": true, "playlists": playlists })))
}

/// The logged-in user's playlists.
///
/// GET /api/playlists/my-playlists
#[instrument(skip(state, session))]
pub async fn my_playlists(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<impl IntoResponse> {
    let playlists = PlaylistRepository::new(state.pool())
        .list_by_owner_with_songs(session.user_id)
        .await?;

    Ok(Json(json!({ "success": true, "playlists": playlists })))
}

/// Create an empty playlist.
///
/// POST /api/playlists
#[instrument(skip(state, session, req), fields(name = %req.name))]
pub async fn create(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Playlist name is required".to_string()));
    }

    let playlist = PlaylistRepository::new(state.pool())
        .create(
            req.name.trim(),
            session.user_id,
            req.is_public,
            DEFAULT_PLAYLIST_COVER,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "playlist": playlist })),
    ))
}

/// Append songs, skipping ones already present.
///
/// POST /api/playlists/{playlist_id}/add-songs
#[instrument(skip(state, session, req))]
pub async fn add_songs(
    State(state): State<AppState>,
    session: AuthSession,
    Path(playlist_id): Path<PlaylistId>,
    Json(req): Json<AddSongsRequest>,
) -> Result<impl IntoResponse> {
    let repo = PlaylistRepository::new(state.pool());
    let playlist = require_owned(&repo, playlist_id, &session).await?;

    repo.add_songs(playlist.id, &req.song_ids).await?;
    let playlist = repo
        .get_with_songs(playlist_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Songs added to playlist",
        "playlist": playlist,
    })))
}

/// Update name, visibility, cover image, and/or append songs.
///
/// PUT /api/playlists/{playlist_id}
/// (multipart: `name`, `isPublic`, repeated `songs`, `coverImage`)
#[instrument(skip(state, session, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: AuthSession,
    Path(playlist_id): Path<PlaylistId>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let repo = PlaylistRepository::new(state.pool());
    require_owned(&repo, playlist_id, &session).await?;

    let mut name: Option<String> = None;
    let mut is_public: Option<bool> = None;
    let mut song_ids: Vec<SongId> = Vec::new();
    let mut cover_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    name = Some(value.trim().to_string());
                }
            }
            "isPublic" => {
                let value = field.text().await?;
                is_public = Some(matches!(value.trim(), "true" | "1"));
            }
            "songs" => {
                let value = field.text().await?;
                let id = value.trim().parse::<SongId>().map_err(|_| {
                    AppError::BadRequest(format!("invalid song id: {value}"))
                })?;
                song_ids.push(id);
            }
            "coverImage" => {
                let file_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                cover_path = Some(
                    state
                        .uploads()
                        .save(MediaKind::PlaylistCover, file_name.as_deref(), bytes)
                        .await?,
                );
            }
            _ => {}
        }
    }

    repo.update_meta(playlist_id, name.as_deref(), is_public, cover_path.as_deref())
        .await?;

    if !song_ids.is_empty() {
        repo.add_songs(playlist_id, &song_ids).await?;
    }

    let playlist = repo
        .get_with_songs(playlist_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

    Ok(Json(json!({ "success": true, "playlist": playlist })))
}

/// One playlist with its songs.
///
/// GET /api/playlists/{playlist_id}
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    Path(playlist_id): Path<PlaylistId>,
) -> Result<impl IntoResponse> {
    let playlist = PlaylistRepository::new(state.pool())
        .get_with_songs(playlist_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

    Ok(Json(json!({ "success": true, "playlist": playlist })))
}

/// Load a playlist and reject callers who don't own it.
async fn require_owned(
    repo: &PlaylistRepository<'_>,
    playlist_id: PlaylistId,
    session: &AuthSession,
) -> Result<Playlist> {
    let playlist = repo
        .get(playlist_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

    if playlist.owner != session.user_id {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    Ok(playlist)
}
