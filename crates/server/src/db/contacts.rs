//! Support inbox repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tunila_core::{ContactMessageId, UserId};

use super::RepositoryError;
use crate::models::{ContactMessage, ContactSubmitter};

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    user_id: Option<i32>,
    name: String,
    email: String,
    subject: String,
    message: String,
    admin_reply: Option<String>,
    admin_replied_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    submitter_name: Option<String>,
    submitter_email: Option<String>,
    submitter_picture: Option<String>,
}

impl From<ContactRow> for ContactMessage {
    fn from(r: ContactRow) -> Self {
        let user = match (r.user_id, r.submitter_name, r.submitter_email, r.submitter_picture) {
            (Some(id), Some(name), Some(email), Some(profile_picture)) => Some(ContactSubmitter {
                id: UserId::new(id),
                name,
                email,
                profile_picture,
            }),
            _ => None,
        };

        Self {
            id: ContactMessageId::new(r.id),
            user_id: r.user_id.map(UserId::new),
            name: r.name,
            email: r.email,
            subject: r.subject,
            message: r.message,
            admin_reply: r.admin_reply,
            admin_replied_at: r.admin_replied_at,
            created_at: r.created_at,
            user,
        }
    }
}

const CONTACT_SELECT: &str = "SELECT c.id, c.user_id, c.name, c.email, c.subject, c.message, \
     c.admin_reply, c.admin_replied_at, c.created_at, \
     u.name AS submitter_name, u.email AS submitter_email, \
     u.profile_picture AS submitter_picture \
     FROM contact_messages c LEFT JOIN users u ON u.id = c.user_id";

/// Repository for support messages.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a new support message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: Option<UserId>,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> Result<ContactMessage, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO contact_messages (user_id, name, email, subject, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .bind(email)
        .bind(subject)
        .bind(message)
        .fetch_one(self.pool)
        .await?;

        self.get(ContactMessageId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get one message with its submitter card.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: ContactMessageId,
    ) -> Result<Option<ContactMessage>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!("{CONTACT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// The whole inbox, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<ContactMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(&format!(
            "{CONTACT_SELECT} ORDER BY c.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Record the admin reply. A later reply overwrites an earlier one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message doesn't exist.
    pub async fn set_reply(
        &self,
        id: ContactMessageId,
        reply: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE contact_messages SET admin_reply = $1, admin_replied_at = NOW()
             WHERE id = $2",
        )
        .bind(reply)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
