//! Playlist repository.
//!
//! Membership is the `playlist_songs` join table with an explicit `position`;
//! appends keep insertion order and the primary key rejects duplicates, which
//! is what "only add songs that aren't already in the playlist" needs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tunila_core::{PlaylistId, SongId, UserId};

use super::RepositoryError;
use crate::models::{Playlist, PlaylistWithSongs, Song};

#[derive(Debug, sqlx::FromRow)]
struct PlaylistRow {
    id: i32,
    name: String,
    owner_id: i32,
    is_public: bool,
    cover_image: String,
    created_at: DateTime<Utc>,
}

impl From<PlaylistRow> for Playlist {
    fn from(r: PlaylistRow) -> Self {
        Self {
            id: PlaylistId::new(r.id),
            name: r.name,
            owner: UserId::new(r.owner_id),
            is_public: r.is_public,
            cover_image: r.cover_image,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberSongRow {
    id: i32,
    title: String,
    artist: String,
    artist_id: i32,
    genre: String,
    file_path: String,
    cover_image: String,
    created_at: DateTime<Utc>,
    liked_by: Vec<i32>,
}

impl From<MemberSongRow> for Song {
    fn from(r: MemberSongRow) -> Self {
        Self {
            id: SongId::new(r.id),
            title: r.title,
            artist: r.artist,
            artist_id: UserId::new(r.artist_id),
            genre: r.genre,
            file_path: r.file_path,
            cover_image: r.cover_image,
            liked_by: r.liked_by.into_iter().map(UserId::new).collect(),
            created_at: r.created_at,
        }
    }
}

const PLAYLIST_COLUMNS: &str = "id, name, owner_id, is_public, cover_image, created_at";

/// Repository for playlist database operations.
pub struct PlaylistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlaylistRepository<'a> {
    /// Create a new playlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an empty playlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        owner: UserId,
        is_public: bool,
        cover_image: &str,
    ) -> Result<Playlist, RepositoryError> {
        let row = sqlx::query_as::<_, PlaylistRow>(&format!(
            "INSERT INTO playlists (name, owner_id, is_public, cover_image)
             VALUES ($1, $2, $3, $4)
             RETURNING {PLAYLIST_COLUMNS}"
        ))
        .bind(name)
        .bind(owner)
        .bind(is_public)
        .bind(cover_image)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a playlist without its songs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PlaylistId) -> Result<Option<Playlist>, RepositoryError> {
        let row = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a playlist with its songs in playlist order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_songs(
        &self,
        id: PlaylistId,
    ) -> Result<Option<PlaylistWithSongs>, RepositoryError> {
        let Some(playlist) = self.get(id).await? else {
            return Ok(None);
        };

        let songs = self.songs_of(id).await?;
        Ok(Some(PlaylistWithSongs { playlist, songs }))
    }

    /// All public playlists, songs populated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public_with_songs(
        &self,
    ) -> Result<Vec<PlaylistWithSongs>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists
             WHERE is_public ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.populate(rows).await
    }

    /// A user's playlists (public and private), songs populated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner_with_songs(
        &self,
        owner: UserId,
    ) -> Result<Vec<PlaylistWithSongs>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists
             WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        self.populate(rows).await
    }

    /// A user's public playlists, songs populated (profile pages).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public_by_owner_with_songs(
        &self,
        owner: UserId,
    ) -> Result<Vec<PlaylistWithSongs>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists
             WHERE owner_id = $1 AND is_public ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        self.populate(rows).await
    }

    /// Append songs, skipping any already present.
    ///
    /// Appends run in one transaction so positions stay sequential even when
    /// two requests race.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn add_songs(
        &self,
        playlist_id: PlaylistId,
        song_ids: &[SongId],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for song_id in song_ids {
            sqlx::query(
                "INSERT INTO playlist_songs (playlist_id, song_id, position)
                 SELECT $1, id, (
                     SELECT COALESCE(MAX(position) + 1, 0)
                     FROM playlist_songs WHERE playlist_id = $1
                 )
                 FROM songs WHERE id = $2
                 ON CONFLICT (playlist_id, song_id) DO NOTHING",
            )
            .bind(playlist_id)
            .bind(song_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Update name/visibility/cover; `None` keeps the current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the playlist doesn't exist.
    pub async fn update_meta(
        &self,
        playlist_id: PlaylistId,
        name: Option<&str>,
        is_public: Option<bool>,
        cover_image: Option<&str>,
    ) -> Result<Playlist, RepositoryError> {
        let row = sqlx::query_as::<_, PlaylistRow>(&format!(
            "UPDATE playlists
             SET name = COALESCE($1, name),
                 is_public = COALESCE($2, is_public),
                 cover_image = COALESCE($3, cover_image)
             WHERE id = $4
             RETURNING {PLAYLIST_COLUMNS}"
        ))
        .bind(name)
        .bind(is_public)
        .bind(cover_image)
        .bind(playlist_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Public playlists matching a name pattern or containing a hit song.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_public(
        &self,
        query: &str,
        hit_songs: &[SongId],
        limit: i64,
    ) -> Result<Vec<PlaylistWithSongs>, RepositoryError> {
        let pattern = format!("%{query}%");
        let hit_ids: Vec<i32> = hit_songs.iter().map(|s| s.as_i32()).collect();

        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists p
             WHERE p.is_public AND (
                 p.name ILIKE $1 OR EXISTS (
                     SELECT 1 FROM playlist_songs ps
                     WHERE ps.playlist_id = p.id AND ps.song_id = ANY($2)
                 )
             )
             ORDER BY p.created_at DESC LIMIT $3"
        ))
        .bind(pattern)
        .bind(&hit_ids)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        self.populate(rows).await
    }

    /// Songs of a playlist, in playlist order, likes aggregated.
    async fn songs_of(&self, id: PlaylistId) -> Result<Vec<Song>, RepositoryError> {
        let rows = sqlx::query_as::<_, MemberSongRow>(
            "SELECT s.id, s.title, s.artist, s.artist_id, s.genre, s.file_path,
                    s.cover_image, s.created_at,
                    COALESCE(ARRAY_AGG(l.user_id) FILTER (WHERE l.user_id IS NOT NULL), '{}')
                        AS liked_by
             FROM playlist_songs ps
             JOIN songs s ON s.id = ps.song_id
             LEFT JOIN song_likes l ON l.song_id = s.id
             WHERE ps.playlist_id = $1
             GROUP BY s.id, ps.position
             ORDER BY ps.position",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn populate(
        &self,
        rows: Vec<PlaylistRow>,
    ) -> Result<Vec<PlaylistWithSongs>, RepositoryError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let playlist: Playlist = row.into();
            let songs = self.songs_of(playlist.id).await?;
            out.push(PlaylistWithSongs { playlist, songs });
        }
        Ok(out)
    }
}
