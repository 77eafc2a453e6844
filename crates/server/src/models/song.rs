//! Song model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tunila_core::{SongId, UserId};

/// An uploaded track.
///
/// `artist` is the display name captured at upload time; `artist_id` is the
/// owning account. `liked_by` is aggregated from the like join table, so the
/// JSON keeps the `likedBy` array shape the SPA expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub artist_id: UserId,
    pub genre: String,
    pub file_path: String,
    pub cover_image: String,
    pub liked_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}
