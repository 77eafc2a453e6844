//! Database access for the Tunila `PostgreSQL` schema.
//!
//! Each resource gets a repository struct borrowing the shared pool. Queries
//! use the runtime sqlx API with private row structs that are mapped into the
//! domain models from [`crate::models`]; parsing failures surface as
//! [`RepositoryError::DataCorruption`] rather than panics.
//!
//! ## Tables
//!
//! - `users` - Accounts, roles, OTP state, seller flag
//! - `songs` / `song_likes` - Uploaded tracks and the like join table
//! - `playlists` / `playlist_songs` - Ordered playlist membership
//! - `merchandise` / `wishlist` - Listings and the wishlist join table
//! - `transactions` - Payment sessions (`pidx` unique, status machine)
//! - `contact_messages` - Support inbox with a single admin reply slot
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tunila-cli -- migrate
//! ```

pub mod contacts;
pub mod merchandise;
pub mod playlists;
pub mod songs;
pub mod transactions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors produced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row not found where one was required.
    #[error("not found")]
    NotFound,

    /// Unique-constraint conflict (duplicate email, duplicate pidx, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value failed to parse into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Map a sqlx error, translating unique violations into `Conflict`.
    pub(crate) fn from_sqlx(e: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create a pool without connecting.
///
/// Used by tests that need an `AppState` but never reach the database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_pool_lazy(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    Ok(PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(database_url.expose_secret())?)
}
