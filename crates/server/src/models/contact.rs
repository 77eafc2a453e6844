//! Support inbox models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tunila_core::{ContactMessageId, UserId};

/// A support message, optionally linked to an account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    /// Single reply slot; a later reply overwrites an earlier one.
    pub admin_reply: Option<String>,
    pub admin_replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Submitter card when the message came from a logged-in account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ContactSubmitter>,
}

/// The submitter fields attached to admin inbox listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmitter {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub profile_picture: String,
}
