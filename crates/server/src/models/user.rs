//! Account model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tunila_core::{Email, UserId, UserRole};

/// A Tunila account.
///
/// The password hash and OTP state never leave the repository layer; this
/// struct is safe to serialize into any response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub is_account_verified: bool,
    /// Deactivated accounts cannot log in; flipped by admins.
    pub is_active: bool,
    pub cover_image: String,
    pub profile_picture: String,
    /// Granted once a verified user has published at least one song.
    pub can_sell_merch: bool,
    pub created_at: DateTime<Utc>,
}
