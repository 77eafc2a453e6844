//! User repository.
//!
//! Owns everything on the `users` table: account CRUD, credential lookup for
//! login, OTP state for email verification and password reset, moderation
//! flags, and the derived merch-seller grant. Password hashes and OTPs never
//! leave this module inside a [`User`] model.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tunila_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, role, is_account_verified, is_active, \
     cover_image, profile_picture, can_sell_merch, created_at";

/// Row shape for the `users` table, minus credential state.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role: String,
    is_account_verified: bool,
    is_active: bool,
    cover_image: String,
    profile_picture: String,
    can_sell_merch: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(User {
            id: UserId::new(self.id),
            name: self.name,
            email,
            role,
            is_account_verified: self.is_account_verified,
            is_active: self.is_active,
            cover_image: self.cover_image,
            profile_picture: self.profile_picture,
            can_sell_merch: self.can_sell_merch,
            created_at: self.created_at,
        })
    }
}

/// OTP state for either the verification or the reset flow.
#[derive(Debug, sqlx::FromRow)]
pub struct OtpState {
    pub user_id: UserId,
    pub otp: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `DataCorruption` if a stored value fails to parse.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Create a new user with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "email already exists"))?;

        row.into_user()
    }

    /// Get a user and their password hash by email, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserAuthRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => {
                let hash = r.password_hash.clone();
                Ok(Some((r.into_user()?, hash)))
            }
            None => Ok(None),
        }
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // OTP state
    // =========================================================================

    /// Store a verification OTP and its expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_verify_otp(
        &self,
        user_id: UserId,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET verify_otp = $1, verify_otp_expires_at = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(otp)
        .bind(expires_at)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Current verification OTP state for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn verify_otp_state(
        &self,
        user_id: UserId,
    ) -> Result<Option<OtpState>, RepositoryError> {
        let row = sqlx::query_as::<_, OtpState>(
            "SELECT id AS user_id, verify_otp AS otp, verify_otp_expires_at AS expires_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark the account verified and clear the verification OTP.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn mark_account_verified(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET is_account_verified = TRUE, verify_otp = '',
                 verify_otp_expires_at = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Store a password-reset OTP and its expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_reset_otp(
        &self,
        user_id: UserId,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET reset_otp = $1, reset_otp_expires_at = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(otp)
        .bind(expires_at)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Current reset OTP state for an email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reset_otp_state(
        &self,
        email: &Email,
    ) -> Result<Option<OtpState>, RepositoryError> {
        let row = sqlx::query_as::<_, OtpState>(
            "SELECT id AS user_id, reset_otp AS otp, reset_otp_expires_at AS expires_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Replace the password and clear the reset OTP in one update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn reset_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = $1, reset_otp = '', reset_otp_expires_at = NULL,
                 updated_at = NOW()
             WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Profile & moderation
    // =========================================================================

    /// Update profile media paths; `None` keeps the current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile_images(
        &self,
        user_id: UserId,
        cover_image: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET cover_image = COALESCE($1, cover_image),
                 profile_picture = COALESCE($2, profile_picture),
                 updated_at = NOW()
             WHERE id = $3
             RETURNING {USER_COLUMNS}"
        ))
        .bind(cover_image)
        .bind(profile_picture)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_user()
    }

    /// List every account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Accounts matching a name/email pattern.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE name ILIKE $1 OR email ILIKE $1
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Accounts from a candidate set that also match a name/email pattern.
    ///
    /// Used by search to surface the artists behind song and merch hits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_among(
        &self,
        candidates: &[UserId],
        query: &str,
        limit: i64,
    ) -> Result<Vec<User>, RepositoryError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{query}%");
        let ids: Vec<i32> = candidates.iter().map(|u| u.as_i32()).collect();
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE id = ANY($1) AND (name ILIKE $2 OR email ILIKE $2)
             ORDER BY created_at DESC LIMIT $3"
        ))
        .bind(&ids)
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Delete an account.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the active flag, returning the updated account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_active(
        &self,
        user_id: UserId,
        is_active: bool,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET is_active = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {USER_COLUMNS}"
        ))
        .bind(is_active)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_user()
    }

    /// Grant the merch-seller flag. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grant_merch_seller(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET can_sell_merch = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

/// Row shape for login: user columns plus the password hash.
#[derive(Debug, sqlx::FromRow)]
struct UserAuthRow {
    id: i32,
    name: String,
    email: String,
    role: String,
    is_account_verified: bool,
    is_active: bool,
    cover_image: String,
    profile_picture: String,
    can_sell_merch: bool,
    created_at: DateTime<Utc>,
    password_hash: String,
}

impl UserAuthRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        UserRow {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            is_account_verified: self.is_account_verified,
            is_active: self.is_active,
            cover_image: self.cover_image,
            profile_picture: self.profile_picture,
            can_sell_merch: self.can_sell_merch,
            created_at: self.created_at,
        }
        .into_user()
    }
}
