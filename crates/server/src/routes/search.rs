//! Search route handlers.
//!
//! One query fans out across songs, merchandise, artists, users, and public
//! playlists, each with its own bounded limit. Every song hit additionally
//! carries up to three related songs by the same artist plus the artist's
//! account - a follow-up query per hit, bounded by the song limit.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use tunila_core::UserId;

use crate::db::merchandise::MerchandiseRepository;
use crate::db::playlists::PlaylistRepository;
use crate::db::songs::SongRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::models::{MerchandiseWithArtist, PlaylistWithSongs, Song, User};
use crate::state::AppState;

const SONG_LIMIT: i64 = 10;
const MERCH_LIMIT: i64 = 5;
const ARTIST_LIMIT: i64 = 5;
const USER_LIMIT: i64 = 5;
const PLAYLIST_LIMIT: i64 = 5;
const RELATED_LIMIT: i64 = 3;
const MERCH_ONLY_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A song hit with its related strip and artist attached.
#[derive(Debug, Serialize)]
pub struct SongHit {
    #[serde(flatten)]
    pub song: Song,
    pub related: Vec<Song>,
    pub artist: Option<User>,
}

/// Everything one query matched.
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub songs: Vec<SongHit>,
    pub merchandise: Vec<MerchandiseWithArtist>,
    pub artists: Vec<User>,
    pub users: Vec<User>,
    pub playlists: Vec<PlaylistWithSongs>,
}

/// Cross-resource search.
///
/// GET /api/search?q=
#[instrument(skip(state), fields(q = %query.q))]
pub async fn search_all(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::BadRequest("Search query required".to_string()));
    }

    let songs_repo = SongRepository::new(state.pool());
    let users_repo = UserRepository::new(state.pool());

    let song_matches = songs_repo.search(q, SONG_LIMIT).await?;
    let merchandise = MerchandiseRepository::new(state.pool())
        .search_in_stock(q, MERCH_LIMIT)
        .await?;

    // Artists behind the hit set, filtered by the query again
    let mut candidate_artists: Vec<UserId> = song_matches
        .iter()
        .map(|s| s.artist_id)
        .chain(merchandise.iter().map(|m| m.merch.artist_id))
        .collect();
    candidate_artists.sort_unstable();
    candidate_artists.dedup();

    let artists = users_repo
        .search_among(&candidate_artists, q, ARTIST_LIMIT)
        .await?;
    let users = users_repo.search(q, USER_LIMIT).await?;

    let playlists = PlaylistRepository::new(state.pool())
        .search_public(
            q,
            &song_matches.iter().map(|s| s.id).collect::<Vec<_>>(),
            PLAYLIST_LIMIT,
        )
        .await?;

    // One related-strip query per hit; bounded by SONG_LIMIT
    let mut songs = Vec::with_capacity(song_matches.len());
    for song in song_matches {
        let related = songs_repo
            .related_by_artist(song.artist_id, song.id, RELATED_LIMIT)
            .await?;
        let artist = users_repo.get(song.artist_id).await?;
        songs.push(SongHit {
            song,
            related,
            artist,
        });
    }

    Ok(Json(json!({
        "success": true,
        "results": SearchResults {
            songs,
            merchandise,
            artists,
            users,
            playlists,
        },
    })))
}

/// In-stock merchandise search.
///
/// GET /api/search/merch?q=
#[instrument(skip(state), fields(q = %query.q))]
pub async fn search_merch(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::BadRequest("Search query required".to_string()));
    }

    let results = MerchandiseRepository::new(state.pool())
        .search_in_stock(q, MERCH_ONLY_LIMIT)
        .await?;

    Ok(Json(json!({ "success": true, "results": results })))
}
