//! Authentication service.
//!
//! Credentials, the JWT minted into the `token` cookie, and the two OTP
//! flows (email verification, password reset). Route handlers own the
//! side-channel work - setting cookies and sending the OTP emails - this
//! module owns the decisions.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use tunila_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Session token lifetime (mirrors the cookie's Max-Age).
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Verification OTPs live for a day.
const VERIFY_OTP_TTL_HOURS: i64 = 24;

/// Reset OTPs are short-lived.
const RESET_OTP_TTL_MINUTES: i64 = 15;

/// JWT claims carried in the `token` cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    jwt_secret: &'a SecretString,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt_secret: &'a SecretString) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt_secret,
        }
    }

    // =========================================================================
    // Registration & login
    // =========================================================================

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid,
    /// `WeakPassword` if the password doesn't meet requirements, and
    /// `UserAlreadyExists` if the email is taken.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email or password
    /// (indistinguishable on purpose), and `AccountDeactivated` for accounts
    /// an admin has switched off.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Session tokens
    // =========================================================================

    /// Mint a session token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_token(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.as_i32(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.expose_secret().as_bytes()),
        )
        .map_err(AuthError::TokenSigning)
    }

    /// Verify a session token and extract the user id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for anything wrong with the token:
    /// bad signature, malformed, or expired.
    pub fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(UserId::new(data.claims.sub))
    }

    // =========================================================================
    // Email verification OTP
    // =========================================================================

    /// Generate and store a verification OTP for a user.
    ///
    /// Returns the user and the OTP so the caller can email it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyVerified` if the account is verified, and
    /// `UserNotFound` if the id doesn't resolve.
    pub async fn start_email_verification(
        &self,
        user_id: UserId,
    ) -> Result<(User, String), AuthError> {
        let user = self.users.get(user_id).await?.ok_or(AuthError::UserNotFound)?;

        if user.is_account_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let otp = generate_otp();
        let expires_at = Utc::now() + Duration::hours(VERIFY_OTP_TTL_HOURS);
        self.users.set_verify_otp(user_id, &otp, expires_at).await?;

        Ok((user, otp))
    }

    /// Confirm the verification OTP and mark the account verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` on mismatch and `OtpExpired` past the
    /// deadline.
    pub async fn confirm_email_verification(
        &self,
        user_id: UserId,
        otp: &str,
    ) -> Result<(), AuthError> {
        let state = self
            .users
            .verify_otp_state(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        check_otp(&state.otp, state.expires_at, otp)?;
        self.users.mark_account_verified(user_id).await?;

        Ok(())
    }

    // =========================================================================
    // Password reset OTP
    // =========================================================================

    /// Generate and store a reset OTP for an email address.
    ///
    /// Returns `None` when no account has this address - callers should stay
    /// silent about that to avoid leaking which emails are registered.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address.
    pub async fn start_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        let email = Email::parse(email)?;

        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let otp = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(RESET_OTP_TTL_MINUTES);
        self.users.set_reset_otp(user.id, &otp, expires_at).await?;

        Ok(Some((user, otp)))
    }

    /// Confirm the reset OTP and set a new password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown address,
    /// `InvalidOtp`/`OtpExpired` for OTP problems, and `WeakPassword` if the
    /// replacement fails validation.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        validate_password(new_password)?;

        let state = self
            .users
            .reset_otp_state(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        check_otp(&state.otp, state.expires_at, otp)?;

        let password_hash = hash_password(new_password)?;
        self.users.reset_password(state.user_id, &password_hash).await?;

        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if requirements aren't met.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with argon2 and a fresh salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::PasswordHash)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch and `PasswordHash`
/// if the stored hash is unparseable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::PasswordHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Generate a 6-digit OTP, zero-padded.
#[must_use]
pub fn generate_otp() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Check a submitted OTP against stored state.
fn check_otp(
    stored: &str,
    expires_at: Option<DateTime<Utc>>,
    submitted: &str,
) -> Result<(), AuthError> {
    if stored.is_empty() || stored != submitted {
        return Err(AuthError::InvalidOtp);
    }

    match expires_at {
        Some(deadline) if deadline > Utc::now() => Ok(()),
        _ => Err(AuthError::OtpExpired),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service_secret() -> SecretString {
        SecretString::from("kQ9!vR2@mX7#bT4$cW8%nZ1^aL5&dJ3*")
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password!", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_generate_otp_shape() {
        for _ in 0..32 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_check_otp_match_and_expiry() {
        let future = Some(Utc::now() + Duration::minutes(5));
        assert!(check_otp("123456", future, "123456").is_ok());

        assert!(matches!(
            check_otp("123456", future, "654321"),
            Err(AuthError::InvalidOtp)
        ));

        // Empty stored OTP never matches, even an empty submission
        assert!(matches!(
            check_otp("", future, ""),
            Err(AuthError::InvalidOtp)
        ));

        let past = Some(Utc::now() - Duration::minutes(1));
        assert!(matches!(
            check_otp("123456", past, "123456"),
            Err(AuthError::OtpExpired)
        ));

        assert!(matches!(
            check_otp("123456", None, "123456"),
            Err(AuthError::OtpExpired)
        ));
    }

    #[tokio::test]
    async fn test_token_roundtrip() {
        let secret = service_secret();
        let pool = crate::db::create_pool_lazy(&SecretString::from(
            "postgres://localhost/tunila_unreachable",
        ))
        .unwrap();
        let auth = AuthService::new(&pool, &secret);

        let token = auth.issue_token(UserId::new(42)).unwrap();
        let user_id = auth.verify_token(&token).unwrap();
        assert_eq!(user_id, UserId::new(42));
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let secret = service_secret();
        let pool = crate::db::create_pool_lazy(&SecretString::from(
            "postgres://localhost/tunila_unreachable",
        ))
        .unwrap();
        let auth = AuthService::new(&pool, &secret);

        let mut token = auth.issue_token(UserId::new(1)).unwrap();
        token.push('x');
        assert!(matches!(
            auth.verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_rejected() {
        let pool = crate::db::create_pool_lazy(&SecretString::from(
            "postgres://localhost/tunila_unreachable",
        ))
        .unwrap();

        let secret_a = service_secret();
        let secret_b = SecretString::from("zP3!wQ8@eR5#tY1$uI6%oA0^sD4&fG2*");

        let minter = AuthService::new(&pool, &secret_a);
        let verifier = AuthService::new(&pool, &secret_b);

        let token = minter.issue_token(UserId::new(7)).unwrap();
        assert!(matches!(
            verifier.verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
