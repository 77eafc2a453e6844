//! Domain models serialized directly into API responses.
//!
//! Field names follow the JSON the SPA consumes (camelCase), so these types
//! double as response DTOs; route modules wrap them in small envelope structs.

pub mod contact;
pub mod merchandise;
pub mod playlist;
pub mod song;
pub mod transaction;
pub mod user;

pub use contact::{ContactMessage, ContactSubmitter};
pub use merchandise::{ArtistCard, Merchandise, MerchandiseWithArtist};
pub use playlist::{Playlist, PlaylistWithSongs};
pub use song::Song;
pub use transaction::Transaction;
pub use user::User;
