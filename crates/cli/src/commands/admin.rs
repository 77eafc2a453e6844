//! Admin account management.
//!
//! # Usage
//!
//! ```bash
//! tunila-cli admin create -e admin@tunila.app -n "Admin Name" -p <password>
//! ```
//!
//! Creates the account pre-verified with the `admin` role. The password is
//! hashed exactly the way the server hashes it, so the new admin can log in
//! through the normal endpoint immediately.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use tunila_core::Email;
use tunila_server::services::auth::{hash_password, validate_password};

use super::CommandError;

/// Create an admin account.
///
/// # Errors
///
/// Returns `CommandError` for a malformed email, a weak password, a
/// duplicate account, or database problems.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::Invalid(e.to_string()))?;
    validate_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let password_hash =
        hash_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let database_url = super::database_url()?;
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let result = sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, is_account_verified)
         VALUES ($1, $2, $3, 'admin', TRUE)
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CommandError::Invalid(format!(
            "an account with email {email} already exists"
        )));
    }

    tracing::info!(%email, "admin account created");
    Ok(())
}
