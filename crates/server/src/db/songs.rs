//! Song repository.
//!
//! Likes live in the `song_likes` join table; every song query aggregates the
//! liker ids back into the `likedBy` array the API exposes. The primary key
//! on the join table is what makes like/unlike idempotent - there is no
//! read-modify-write on an array anywhere.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tunila_core::{SongId, UserId};

use super::RepositoryError;
use crate::models::Song;

/// Song columns plus the aggregated liker array.
///
/// Every query in this module is grouped by `s.id`, so the aggregate is
/// always well-formed.
const SONG_SELECT: &str = "SELECT s.id, s.title, s.artist, s.artist_id, s.genre, s.file_path, \
     s.cover_image, s.created_at, \
     COALESCE(ARRAY_AGG(l.user_id) FILTER (WHERE l.user_id IS NOT NULL), '{}') AS liked_by \
     FROM songs s LEFT JOIN song_likes l ON l.song_id = s.id";

#[derive(Debug, sqlx::FromRow)]
struct SongRow {
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

impl From<SongRow> for Song {
    fn from(r: SongRow) -> Self {
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

/// Repository for song database operations.
pub struct SongRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SongRepository<'a> {
    /// Create a new song repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new song.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        title: &str,
        artist: &str,
        artist_id: UserId,
        genre: &str,
        file_path: &str,
        cover_image: &str,
    ) -> Result<Song, RepositoryError> {
        let row = sqlx::query_as::<_, SongRow>(
            "INSERT INTO songs (title, artist, artist_id, genre, file_path, cover_image)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, title, artist, artist_id, genre, file_path, cover_image,
                       created_at, '{}'::INT[] AS liked_by",
        )
        .bind(title)
        .bind(artist)
        .bind(artist_id)
        .bind(genre)
        .bind(file_path)
        .bind(cover_image)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a song by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SongId) -> Result<Option<Song>, RepositoryError> {
        let row = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT} WHERE s.id = $1 GROUP BY s.id"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// All songs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Song>, RepositoryError> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT} GROUP BY s.id ORDER BY s.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Songs uploaded by an artist, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_artist(&self, artist_id: UserId) -> Result<Vec<Song>, RepositoryError> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT} WHERE s.artist_id = $1 GROUP BY s.id ORDER BY s.created_at DESC"
        ))
        .bind(artist_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Count an artist's uploads (drives the merch-seller grant).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_artist(&self, artist_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE artist_id = $1")
                .bind(artist_id)
                .fetch_one(self.pool)
                .await?;

        Ok(count)
    }

    /// Record a like. A repeated like by the same user is a no-op.
    ///
    /// Returns the updated liker list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the song doesn't exist.
    pub async fn like(
        &self,
        song_id: SongId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO song_likes (song_id, user_id)
             SELECT id, $2 FROM songs WHERE id = $1
             ON CONFLICT (song_id, user_id) DO NOTHING",
        )
        .bind(song_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        // Zero rows means either the song is missing or the like already
        // existed; distinguish by checking the song.
        if result.rows_affected() == 0 && self.get(song_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        self.likers(song_id).await
    }

    /// Remove a like. Unliking a song never liked is a no-op.
    ///
    /// Returns the updated liker list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the song doesn't exist.
    pub async fn unlike(
        &self,
        song_id: SongId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, RepositoryError> {
        sqlx::query("DELETE FROM song_likes WHERE song_id = $1 AND user_id = $2")
            .bind(song_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if self.get(song_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        self.likers(song_id).await
    }

    /// Everyone who likes a song.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn likers(&self, song_id: SongId) -> Result<Vec<UserId>, RepositoryError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT user_id FROM song_likes WHERE song_id = $1 ORDER BY created_at",
        )
        .bind(song_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    /// Songs a user has liked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn liked_by_user(&self, user_id: UserId) -> Result<Vec<Song>, RepositoryError> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT}
             WHERE EXISTS (
                 SELECT 1 FROM song_likes mine
                 WHERE mine.song_id = s.id AND mine.user_id = $1
             )
             GROUP BY s.id ORDER BY s.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The most-liked songs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn most_liked(&self, limit: i64) -> Result<Vec<Song>, RepositoryError> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT} GROUP BY s.id
             ORDER BY COUNT(l.user_id) DESC, s.created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Case-insensitive title/artist/genre search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Song>, RepositoryError> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT}
             WHERE s.title ILIKE $1 OR s.artist ILIKE $1 OR s.genre ILIKE $1
             GROUP BY s.id ORDER BY s.created_at DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Other songs by the same artist, for the "related" strip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related_by_artist(
        &self,
        artist_id: UserId,
        exclude: SongId,
        limit: i64,
    ) -> Result<Vec<Song>, RepositoryError> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{SONG_SELECT}
             WHERE s.artist_id = $1 AND s.id <> $2
             GROUP BY s.id ORDER BY s.created_at DESC LIMIT $3"
        ))
        .bind(artist_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a song.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, song_id: SongId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM songs WHERE id = $1")
            .bind(song_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
