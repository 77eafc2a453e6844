//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - API banner
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (probes the database)
//!
//! # Auth (rate limited)
//! POST /api/auth/register        - Create account, set session cookie
//! POST /api/auth/login           - Login, set session cookie
//! POST /api/auth/logout          - Clear session cookie
//! POST /api/auth/send-verify-otp - Email a verification OTP   (auth)
//! POST /api/auth/verify-account  - Confirm the OTP            (auth)
//! GET  /api/auth/is-auth         - Session probe              (auth)
//! POST /api/auth/send-reset-otp  - Email a password reset OTP
//! POST /api/auth/reset-password  - Reset password with the OTP
//!
//! # Users
//! GET  /api/user/data            - Own account                (auth)
//! GET  /api/user/profile/{id}    - Public profile (songs + public playlists)
//! PUT  /api/user/profile         - Update cover/picture       (auth, multipart)
//! GET  /api/user/all-users       - List accounts              (admin)
//! DELETE /api/user/delete/{id}   - Remove account             (admin)
//!
//! # Songs
//! POST /api/songs/upload         - Upload song + cover        (auth, multipart)
//! GET  /api/songs                - All songs
//! POST /api/songs/like           - Like                       (auth)
//! POST /api/songs/unlike         - Unlike                     (auth)
//! GET  /api/songs/liked-songs/{userId} - Songs a user likes
//! GET  /api/songs/popular        - Top 20 by likes
//! DELETE /api/songs/{songId}     - Delete own song            (auth)
//!
//! # Playlists
//! GET  /api/playlists/public     - Public playlists
//! GET  /api/playlists/my-playlists - Own playlists            (auth)
//! POST /api/playlists            - Create                     (auth)
//! POST /api/playlists/{id}/add-songs - Append songs           (auth, owner)
//! PUT  /api/playlists/{id}       - Update                     (auth, owner, multipart)
//! GET  /api/playlists/{id}       - One playlist with songs
//!
//! # Merchandise & payments
//! POST /api/merch                - Create listing             (auth, seller, multipart)
//! GET  /api/merch                - All listings
//! GET  /api/merch/{id}           - One listing
//! POST /api/merch/{id}/wishlist  - Toggle wishlist            (auth)
//! POST /api/merch/payment/initiate - Open payment session     (auth)
//! GET  /api/merch/payment/verify - Gateway redirect target
//! GET  /api/merch/artist/{userId} - Listings by artist
//! GET  /api/merch/wishlist/my-items - Own wishlist            (auth)
//!
//! # Admin
//! GET  /api/admin/users          - All accounts               (admin)
//! GET  /api/admin/songs          - All songs                  (admin)
//! DELETE /api/admin/users/{id}   - Remove account             (admin)
//! DELETE /api/admin/songs/{id}   - Remove song                (admin)
//! PUT  /api/admin/users/deactivate/{id} - Deactivate          (admin)
//! PUT  /api/admin/users/reactivate/{id} - Reactivate          (admin)
//!
//! # Search & recommendations
//! GET  /api/search?q=            - Cross-resource search
//! GET  /api/search/merch?q=      - In-stock merch search
//! GET  /api/recommend/{userId}   - Recommendations with fallback (auth)
//!
//! # Contact
//! POST /api/contact/submit       - Submit support message
//! GET  /api/contact/messages     - Inbox                      (admin)
//! POST /api/contact/reply/{id}   - Email + record reply       (admin)
//! ```

pub mod admin;
pub mod auth;
pub mod contact;
pub mod merch;
pub mod playlists;
pub mod recommend;
pub mod search;
pub mod songs;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router (rate limited).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/send-verify-otp", post(auth::send_verify_otp))
        .route("/verify-account", post(auth::verify_account))
        .route("/is-auth", get(auth::is_auth))
        .route("/send-reset-otp", post(auth::send_reset_otp))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter())
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/data", get(users::get_data))
        .route("/profile/{user_id}", get(users::get_profile))
        .route("/profile", put(users::update_profile))
        .route("/all-users", get(users::all_users))
        .route("/delete/{user_id}", delete(users::delete_user))
}

/// Create the song routes router.
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(songs::upload))
        .route("/", get(songs::list))
        .route("/like", post(songs::like))
        .route("/unlike", post(songs::unlike))
        .route("/liked-songs/{user_id}", get(songs::liked_songs))
        .route("/popular", get(songs::popular))
        .route("/{song_id}", delete(songs::delete))
}

/// Create the playlist routes router.
pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/public", get(playlists::public))
        .route("/my-playlists", get(playlists::my_playlists))
        .route("/", post(playlists::create))
        .route("/{playlist_id}/add-songs", post(playlists::add_songs))
        .route(
            "/{playlist_id}",
            get(playlists::get).put(playlists::update),
        )
}

/// Create the merchandise routes router.
pub fn merch_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(merch::create).get(merch::list))
        .route("/payment/initiate", post(merch::initiate_payment))
        .route("/payment/verify", get(merch::verify_payment))
        .route("/artist/{user_id}", get(merch::by_artist))
        .route("/wishlist/my-items", get(merch::my_wishlist))
        .route("/{merch_id}/wishlist", post(merch::toggle_wishlist))
        .route("/{merch_id}", get(merch::get))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::all_users))
        .route("/songs", get(admin::all_songs))
        .route("/users/{user_id}", delete(admin::delete_user))
        .route("/songs/{song_id}", delete(admin::delete_song))
        .route("/users/deactivate/{user_id}", put(admin::deactivate_user))
        .route("/users/reactivate/{user_id}", put(admin::reactivate_user))
}

/// Create the search routes router.
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search::search_all))
        .route("/merch", get(search::search_merch))
}

/// Create the recommendation routes router.
pub fn recommend_routes() -> Router<AppState> {
    Router::new().route("/{user_id}", get(recommend::for_user))
}

/// Create the contact routes router.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(contact::submit))
        .route("/messages", get(contact::messages))
        .route("/reply/{message_id}", post(contact::reply))
}

/// Compose every API router under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/user", user_routes())
        .nest("/api/songs", song_routes())
        .nest("/api/playlists", playlist_routes())
        .nest("/api/merch", merch_routes())
        .nest("/api/admin", admin_routes())
        .nest("/api/search", search_routes())
        .nest("/api/recommend", recommend_routes())
        .nest("/api/contact", contact_routes())
}
