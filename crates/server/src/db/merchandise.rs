//! Merchandise repository.
//!
//! Wishlists live in the `wishlist` join table and are toggled inside a
//! transaction. Stock is only ever decremented by the purchase finalizer in
//! [`crate::db::transactions`]; nothing here writes to `stock`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tunila_core::{MerchandiseId, UserId};

use super::RepositoryError;
use crate::models::{ArtistCard, Merchandise, MerchandiseWithArtist};

/// Merchandise columns, the wishlist aggregate, and the seller card columns.
///
/// Always grouped by `m.id, a.id`; the artist join is LEFT so a dangling
/// seller reference surfaces as a null card instead of dropping the listing.
const MERCH_SELECT: &str = "SELECT m.id, m.name, m.description, m.price, m.kind, m.images, \
     m.artist_id, m.stock, m.created_at, \
     COALESCE(ARRAY_AGG(w.user_id) FILTER (WHERE w.user_id IS NOT NULL), '{}') AS wishlisted_by, \
     a.id AS card_id, a.name AS card_name, a.profile_picture AS card_picture \
     FROM merchandise m \
     LEFT JOIN wishlist w ON w.merch_id = m.id \
     LEFT JOIN users a ON a.id = m.artist_id";

const MERCH_GROUP: &str = "GROUP BY m.id, a.id";

#[derive(Debug, sqlx::FromRow)]
struct MerchRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    kind: String,
    images: Vec<String>,
    artist_id: i32,
    stock: i32,
    created_at: DateTime<Utc>,
    wishlisted_by: Vec<i32>,
    card_id: Option<i32>,
    card_name: Option<String>,
    card_picture: Option<String>,
}

impl From<MerchRow> for MerchandiseWithArtist {
    fn from(r: MerchRow) -> Self {
        let artist = match (r.card_id, r.card_name, r.card_picture) {
            (Some(id), Some(name), Some(profile_picture)) => Some(ArtistCard {
                id: UserId::new(id),
                name,
                profile_picture,
            }),
            _ => None,
        };

        Self {
            merch: Merchandise {
                id: MerchandiseId::new(r.id),
                name: r.name,
                description: r.description,
                price: r.price,
                kind: r.kind,
                images: r.images,
                artist_id: UserId::new(r.artist_id),
                stock: r.stock,
                wishlisted_by: r.wishlisted_by.into_iter().map(UserId::new).collect(),
                created_at: r.created_at,
            },
            artist,
        }
    }
}

/// Repository for merchandise database operations.
pub struct MerchandiseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MerchandiseRepository<'a> {
    /// Create a new merchandise repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        price: Decimal,
        kind: &str,
        images: &[String],
        artist_id: UserId,
        stock: i32,
    ) -> Result<Merchandise, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct InsertRow {
            id: i32,
            name: String,
            description: String,
            price: Decimal,
            kind: String,
            images: Vec<String>,
            artist_id: i32,
            stock: i32,
            created_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, InsertRow>(
            "INSERT INTO merchandise (name, description, price, kind, images, artist_id, stock)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, name, description, price, kind, images, artist_id, stock, created_at",
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(kind)
        .bind(images)
        .bind(artist_id)
        .bind(stock)
        .fetch_one(self.pool)
        .await?;

        Ok(Merchandise {
            id: MerchandiseId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            kind: row.kind,
            images: row.images,
            artist_id: UserId::new(row.artist_id),
            stock: row.stock,
            wishlisted_by: Vec::new(),
            created_at: row.created_at,
        })
    }

    /// Get a single listing with its seller card.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: MerchandiseId,
    ) -> Result<Option<MerchandiseWithArtist>, RepositoryError> {
        let row = sqlx::query_as::<_, MerchRow>(&format!(
            "{MERCH_SELECT} WHERE m.id = $1 {MERCH_GROUP}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Every listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<MerchandiseWithArtist>, RepositoryError> {
        let rows = sqlx::query_as::<_, MerchRow>(&format!(
            "{MERCH_SELECT} {MERCH_GROUP} ORDER BY m.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Listings by one artist, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_artist(
        &self,
        artist_id: UserId,
    ) -> Result<Vec<MerchandiseWithArtist>, RepositoryError> {
        let rows = sqlx::query_as::<_, MerchRow>(&format!(
            "{MERCH_SELECT} WHERE m.artist_id = $1 {MERCH_GROUP} ORDER BY m.created_at DESC"
        ))
        .bind(artist_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Toggle a wishlist entry.
    ///
    /// Returns `true` if the item is now wishlisted, `false` if the toggle
    /// removed it. Runs in a transaction so a double-tap settles on one state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing doesn't exist.
    pub async fn toggle_wishlist(
        &self,
        merch_id: MerchandiseId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM merchandise WHERE id = $1")
            .bind(merch_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let removed = sqlx::query("DELETE FROM wishlist WHERE merch_id = $1 AND user_id = $2")
            .bind(merch_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let in_wishlist = if removed == 0 {
            sqlx::query(
                "INSERT INTO wishlist (merch_id, user_id) VALUES ($1, $2)
                 ON CONFLICT (merch_id, user_id) DO NOTHING",
            )
            .bind(merch_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;
        Ok(in_wishlist)
    }

    /// Listings a user has wishlisted, newest wishlist entries first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn wishlist_of(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MerchandiseWithArtist>, RepositoryError> {
        let rows = sqlx::query_as::<_, MerchRow>(&format!(
            "{MERCH_SELECT}
             WHERE EXISTS (
                 SELECT 1 FROM wishlist mine
                 WHERE mine.merch_id = m.id AND mine.user_id = $1
             )
             {MERCH_GROUP} ORDER BY m.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// In-stock listings matching name/description/kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_in_stock(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<MerchandiseWithArtist>, RepositoryError> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, MerchRow>(&format!(
            "{MERCH_SELECT}
             WHERE m.stock > 0
               AND (m.name ILIKE $1 OR m.description ILIKE $1 OR m.kind ILIKE $1)
             {MERCH_GROUP} ORDER BY m.created_at DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
