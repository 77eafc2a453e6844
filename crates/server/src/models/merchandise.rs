//! Merchandise models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tunila_core::{MerchandiseId, UserId};

/// A merchandise listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchandise {
    pub id: MerchandiseId,
    pub name: String,
    pub description: String,
    /// Unit price in rupees.
    pub price: Decimal,
    /// Listing category (t-shirt, vinyl, poster, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Public `/uploads/merch/...` paths.
    pub images: Vec<String>,
    pub artist_id: UserId,
    pub stock: i32,
    pub wishlisted_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

/// The artist fields attached to listings (name + picture card).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistCard {
    pub id: UserId,
    pub name: String,
    pub profile_picture: String,
}

/// A listing with its artist card attached.
///
/// The artist is optional: a dangling seller reference renders as `null`
/// instead of failing the whole listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseWithArtist {
    #[serde(flatten)]
    pub merch: Merchandise,
    pub artist: Option<ArtistCard>,
}
