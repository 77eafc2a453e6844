//! Recommendation microservice client.
//!
//! The recommender is a separate process reached over HTTP. It is the one
//! dependency the platform explicitly degrades around: when it is down,
//! slow, or answers without recommendations, the recommend route falls back
//! to the most-liked songs instead of failing the request.

use serde::Deserialize;
use thiserror::Error;

use tunila_core::UserId;

use crate::config::RecommenderConfig;

/// Errors that can occur when fetching recommendations.
///
/// Every variant is a fallback trigger, not a user-facing failure.
#[derive(Debug, Error)]
pub enum RecommenderError {
    /// HTTP request failed (service down, timeout, DNS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success HTTP status.
    #[error("recommender returned status {0}")]
    Api(u16),

    /// Service answered `success: false` (e.g. the user has no likes yet).
    #[error("recommender had no recommendations")]
    Unsuccessful,
}

#[derive(Debug, Deserialize)]
struct RecommendResponse {
    success: bool,
    #[serde(default)]
    recommended_songs: Vec<serde_json::Value>,
}

/// Recommendation microservice client.
#[derive(Clone)]
pub struct RecommenderClient {
    client: reqwest::Client,
    base_url: String,
}

impl RecommenderClient {
    /// Create a new recommender client.
    #[must_use]
    pub fn new(config: &RecommenderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Fetch recommendations for a user.
    ///
    /// The songs come back as raw JSON documents - the recommender owns
    /// their shape and this service proxies them through untouched.
    ///
    /// # Errors
    ///
    /// Any [`RecommenderError`]; callers are expected to fall back rather
    /// than propagate.
    pub async fn recommendations_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<serde_json::Value>, RecommenderError> {
        let url = format!("{}/api/recommend/{user_id}", self.base_url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(RecommenderError::Api(status.as_u16()));
        }

        let body: RecommendResponse = response.json().await?;

        if !body.success {
            return Err(RecommenderError::Unsuccessful);
        }

        Ok(body.recommended_songs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "success": true,
            "recommended_songs": [
                {"title": "Resham", "genre": "folk"},
                {"title": "Parelima", "genre": "rock"}
            ]
        }"#;

        let parsed: RecommendResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.recommended_songs.len(), 2);
    }

    #[test]
    fn test_unsuccessful_response_without_songs() {
        let json = r#"{"success": false, "message": "No liked songs found."}"#;
        let parsed: RecommendResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.success);
        assert!(parsed.recommended_songs.is_empty());
    }
}
