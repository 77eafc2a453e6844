//! Recommendation route handler.
//!
//! Proxies the external recommender and degrades to the most-liked songs
//! when it can't answer. The fallback list is cached briefly so a recommender
//! outage doesn't turn into a most-liked query per request.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::instrument;

use tunila_core::UserId;

use crate::db::songs::SongRepository;
use crate::error::Result;
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

const FALLBACK_LIMIT: i64 = 10;

/// Recommendations for a user.
///
/// GET /api/recommend/{user_id}
#[instrument(skip(state, _session))]
pub async fn for_user(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse> {
    match state.recommender().recommendations_for(user_id).await {
        Ok(recommended) => Ok(Json(json!({
            "success": true,
            "recommendedSongs": recommended,
            "fallback": false,
        }))),
        Err(e) => {
            tracing::warn!(error = %e, user = %user_id, "recommender unavailable, using fallback");

            let songs = match state.fallback_songs().get(&()).await {
                Some(cached) => cached,
                None => {
                    let fresh = SongRepository::new(state.pool())
                        .most_liked(FALLBACK_LIMIT)
                        .await?;
                    state.fallback_songs().insert((), fresh.clone()).await;
                    fresh
                }
            };

            Ok(Json(json!({
                "success": true,
                "recommendedSongs": songs,
                "fallback": true,
            })))
        }
    }
}
