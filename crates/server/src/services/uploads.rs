//! Upload storage for media files.
//!
//! Multipart uploads land here: bytes are written under the configured
//! uploads root in a per-kind subdirectory, and the returned public path
//! (`/uploads/...`) is what gets persisted and served by the static file
//! route. File names are sanitized and prefixed with a millisecond timestamp
//! so re-uploads of `cover.png` never clobber each other.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::Utc;
use thiserror::Error;

/// Default covers used when nothing has been uploaded yet.
pub const DEFAULT_COVER_IMAGE: &str = "/uploads/covers/default.png";
pub const DEFAULT_PROFILE_PICTURE: &str = "/uploads/profile_pictures/default.png";
pub const DEFAULT_PLAYLIST_COVER: &str = "/uploads/covers/playlists/default.png";

/// Errors that can occur storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The uploaded part had no bytes.
    #[error("uploaded file is empty")]
    Empty,
}

/// What kind of media is being stored; picks the subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Song,
    SongCover,
    PlaylistCover,
    UserCover,
    ProfilePicture,
    MerchImage,
}

impl MediaKind {
    /// Subdirectory under the uploads root.
    #[must_use]
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::Song => "songs",
            Self::SongCover => "covers",
            Self::PlaylistCover => "covers/playlists",
            Self::UserCover => "covers/users",
            Self::ProfilePicture => "profile_pictures",
            Self::MerchImage => "merch",
        }
    }
}

/// Filesystem store for uploaded media.
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at the configured uploads directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory served under `/uploads`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an uploaded file and return its public `/uploads/...` path.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Empty` for zero-length uploads and `Io` for
    /// filesystem failures.
    pub async fn save(
        &self,
        kind: MediaKind,
        original_name: Option<&str>,
        bytes: Bytes,
    ) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }

        let file_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(original_name.unwrap_or("file"))
        );

        let dir = self.root.join(kind.subdir());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        Ok(format!("/uploads/{}/{file_name}", kind.subdir()))
    }
}

/// Reduce a client-supplied file name to something safe to put on disk.
///
/// Takes the final path component, keeps ASCII alphanumerics plus `.`,
/// `-` and `_`, and maps everything else to `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim_start_matches('.');

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_simple_names() {
        assert_eq!(sanitize_file_name("track.mp3"), "track.mp3");
        assert_eq!(sanitize_file_name("cover-art_2.png"), "cover-art_2.png");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\music\\track.mp3"), "track.mp3");
    }

    #[test]
    fn test_sanitize_replaces_odd_characters() {
        assert_eq!(sanitize_file_name("my song (live)!.mp3"), "my_song__live__.mp3");
    }

    #[test]
    fn test_sanitize_never_empty() {
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn test_subdirs_match_served_layout() {
        assert_eq!(MediaKind::Song.subdir(), "songs");
        assert_eq!(MediaKind::PlaylistCover.subdir(), "covers/playlists");
        assert_eq!(MediaKind::MerchImage.subdir(), "merch");
    }

    #[tokio::test]
    async fn test_save_writes_file_and_returns_public_path() {
        let dir = std::env::temp_dir().join(format!(
            "tunila-uploads-test-{}",
            std::process::id()
        ));
        let store = UploadStore::new(&dir);

        let path = store
            .save(MediaKind::SongCover, Some("art.png"), Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert!(path.starts_with("/uploads/covers/"));
        assert!(path.ends_with("-art.png"));

        let on_disk = dir.join(path.trim_start_matches("/uploads/"));
        let contents = tokio::fs::read(&on_disk).await.unwrap();
        assert_eq!(contents, b"png");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejects_empty_upload() {
        let store = UploadStore::new(std::env::temp_dir());
        let result = store
            .save(MediaKind::Song, Some("empty.mp3"), Bytes::new())
            .await;
        assert!(matches!(result, Err(UploadError::Empty)));
    }
}
