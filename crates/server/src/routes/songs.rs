//! Song route handlers: upload, listing, likes, deletion.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use tunila_core::{SongId, UserId};

use crate::db::songs::SongRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::services::uploads::MediaKind;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongIdRequest {
    pub song_id: SongId,
}

/// Upload a song with its cover image.
///
/// POST /api/songs/upload (multipart: `title`, `genre`, `song`, `cover`)
///
/// Uploading also drives the merch-seller grant: a verified account with at
/// least one published song may sell merchandise.
#[instrument(skip(state, session, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut title: Option<String> = None;
    let mut genre: Option<String> = None;
    let mut song_path: Option<String> = None;
    let mut cover_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await?),
            "genre" => genre = Some(field.text().await?),
            "song" => {
                let file_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                song_path = Some(
                    state
                        .uploads()
                        .save(MediaKind::Song, file_name.as_deref(), bytes)
                        .await?,
                );
            }
            "cover" => {
                let file_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                cover_path = Some(
                    state
                        .uploads()
                        .save(MediaKind::SongCover, file_name.as_deref(), bytes)
                        .await?,
                );
            }
            _ => {}
        }
    }

    let (Some(song_path), Some(cover_path)) = (song_path, cover_path) else {
        return Err(AppError::BadRequest("Files are required".to_string()));
    };
    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Title is required".to_string()))?;
    let genre = genre
        .filter(|g| !g.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Genre is required".to_string()))?;

    let users = UserRepository::new(state.pool());
    let mut user = users
        .get(session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let songs = SongRepository::new(state.pool());
    let song = songs
        .create(
            title.trim(),
            &user.name,
            user.id,
            genre.trim(),
            &song_path,
            &cover_path,
        )
        .await?;

    // Verified artists unlock merch selling with their first published song
    if user.is_account_verified && !user.can_sell_merch {
        let count = songs.count_by_artist(user.id).await?;
        if count >= 1 {
            users.grant_merch_seller(user.id).await?;
            user.can_sell_merch = true;
            tracing::info!(user = %user.id, "merch selling enabled");
        }
    }

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "success": true,
            "song": song,
            "userData": { "canSellMerch": user.can_sell_merch },
        })),
    ))
}

/// All songs.
///
/// GET /api/songs
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let songs = SongRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "songs": songs })))
}

/// Like a song. Liking twice is a no-op.
///
/// POST /api/songs/like
#[instrument(skip(state, session))]
pub async fn like(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<SongIdRequest>,
) -> Result<impl IntoResponse> {
    let liked_by = SongRepository::new(state.pool())
        .like(req.song_id, session.user_id)
        .await
        .map_err(not_found_as_song)?;

    Ok(Json(json!({
        "success": true,
        "message": "Song liked",
        "likedBy": liked_by,
    })))
}

/// Unlike a song. Unliking a song never liked is a no-op.
///
/// POST /api/songs/unlike
#[instrument(skip(state, session))]
pub async fn unlike(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<SongIdRequest>,
) -> Result<impl IntoResponse> {
    let liked_by = SongRepository::new(state.pool())
        .unlike(req.song_id, session.user_id)
        .await
        .map_err(not_found_as_song)?;

    Ok(Json(json!({
        "success": true,
        "message": "Song unliked",
        "likedBy": liked_by,
    })))
}

/// Songs a user has liked.
///
/// GET /api/songs/liked-songs/{user_id}
#[instrument(skip(state))]
pub async fn liked_songs(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let liked = SongRepository::new(state.pool())
        .liked_by_user(user_id)
        .await?;

    Ok(Json(json!({ "success": true, "likedSongs": liked })))
}

/// The 20 most-liked songs.
///
/// GET /api/songs/popular
#[instrument(skip(state))]
pub async fn popular(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let songs = SongRepository::new(state.pool()).most_liked(20).await?;
    Ok(Json(json!({ "success": true, "songs": songs })))
}

/// Delete an own song.
///
/// DELETE /api/songs/{song_id}
#[instrument(skip(state, session))]
pub async fn delete(
    State(state): State<AppState>,
    session: AuthSession,
    Path(song_id): Path<SongId>,
) -> Result<impl IntoResponse> {
    let songs = SongRepository::new(state.pool());
    let song = songs
        .get(song_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Song not found".to_string()))?;

    if song.artist_id != session.user_id {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this song".to_string(),
        ));
    }

    songs.delete(song_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Song deleted successfully",
    })))
}

fn not_found_as_song(e: crate::db::RepositoryError) -> AppError {
    match e {
        crate::db::RepositoryError::NotFound => {
            AppError::NotFound("Song not found".to_string())
        }
        other => AppError::Database(other),
    }
}
