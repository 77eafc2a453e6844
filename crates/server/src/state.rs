//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::models::Song;
use crate::services::email::EmailService;
use crate::services::khalti::{KhaltiClient, KhaltiError};
use crate::services::recommender::RecommenderClient;
use crate::services::uploads::UploadStore;

/// How long the most-liked fallback stays fresh.
const FALLBACK_CACHE_TTL: Duration = Duration::from_secs(60);

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment gateway client: {0}")]
    Khalti(#[from] KhaltiError),
    #[error("email transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    khalti: KhaltiClient,
    recommender: RecommenderClient,
    email: EmailService,
    uploads: UploadStore,
    /// Most-liked songs, served when the recommender is unavailable.
    fallback_songs: Cache<(), Vec<Song>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway client or SMTP transport cannot be
    /// constructed from the configuration.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let khalti = KhaltiClient::new(&config.khalti)?;
        let recommender = RecommenderClient::new(&config.recommender);
        let email = EmailService::new(&config.email)?;
        let uploads = UploadStore::new(config.uploads_dir.clone());

        let fallback_songs = Cache::builder()
            .max_capacity(1)
            .time_to_live(FALLBACK_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                khalti,
                recommender,
                email,
                uploads,
                fallback_songs,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn khalti(&self) -> &KhaltiClient {
        &self.inner.khalti
    }

    /// Get a reference to the recommender client.
    #[must_use]
    pub fn recommender(&self) -> &RecommenderClient {
        &self.inner.recommender
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the upload store.
    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Cache holding the most-liked-songs recommendation fallback.
    #[must_use]
    pub fn fallback_songs(&self) -> &Cache<(), Vec<Song>> {
        &self.inner.fallback_songs
    }
}
