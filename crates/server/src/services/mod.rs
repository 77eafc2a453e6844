//! Application services.
//!
//! Everything that is not a route handler or a repository lives here: the
//! auth service (credentials, OTPs, tokens), outbound email, the payment
//! gateway client, the recommender client, and upload storage.

pub mod auth;
pub mod email;
pub mod khalti;
pub mod recommender;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
pub use khalti::{KhaltiClient, KhaltiError};
pub use recommender::{RecommenderClient, RecommenderError};
pub use uploads::{MediaKind, UploadError, UploadStore};
