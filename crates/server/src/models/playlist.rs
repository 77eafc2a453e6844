//! Playlist models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tunila_core::{PlaylistId, UserId};

use super::Song;

/// A playlist without its tracks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub owner: UserId,
    pub is_public: bool,
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
}

/// A playlist with its tracks populated in playlist order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistWithSongs {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub songs: Vec<Song>,
}
