//! Khalti payment gateway client.
//!
//! Two calls make up the whole integration: `epayment/initiate/` opens a
//! payment session and returns the `pidx` plus a hosted payment URL the SPA
//! redirects to; `epayment/lookup/` reports what happened to that session.
//! Amounts are integer paisa. There is no retry policy - a failed call
//! surfaces to the handler, which collapses it into the failure redirect.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::KhaltiConfig;

/// Errors that can occur when talking to the gateway.
#[derive(Debug, Error)]
pub enum KhaltiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("gateway error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to construct the client or parse a response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Buyer details forwarded with an initiate call.
#[derive(Debug, Serialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Request body for `epayment/initiate/`.
#[derive(Debug, Serialize)]
pub struct InitiateRequest {
    /// Where the gateway redirects the buyer after payment.
    pub return_url: String,
    /// The site the session belongs to.
    pub website_url: String,
    /// Total charge in paisa.
    pub amount: u64,
    pub purchase_order_id: String,
    pub purchase_order_name: String,
    pub customer_info: CustomerInfo,
}

/// Response from `epayment/initiate/`.
#[derive(Debug, Deserialize)]
pub struct InitiateResponse {
    /// Payment session id, the correlation key for later lookup.
    pub pidx: String,
    /// Hosted payment page to redirect the buyer to.
    pub payment_url: String,
}

/// Session status reported by `epayment/lookup/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaymentStatus {
    Completed,
    Pending,
    Initiated,
    Expired,
    #[serde(rename = "User canceled")]
    UserCanceled,
    Refunded,
    #[serde(rename = "Partially refunded")]
    PartiallyRefunded,
    /// Anything the gateway adds later; treated as not-completed.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether the payment actually went through.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Response from `epayment/lookup/`.
#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    pub pidx: String,
    pub status: PaymentStatus,
    /// Total in paisa, echoed back by the gateway.
    pub total_amount: Option<i64>,
    /// Gateway-side transaction id, present once the payment settles.
    pub transaction_id: Option<String>,
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    pidx: &'a str,
}

/// Khalti gateway client.
#[derive(Clone)]
pub struct KhaltiClient {
    client: reqwest::Client,
    base_url: String,
}

impl KhaltiClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &KhaltiConfig) -> Result<Self, KhaltiError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Key {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| KhaltiError::Parse(format!("invalid gateway key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        headers.insert(
            "Content-Type",
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Open a payment session.
    ///
    /// # Errors
    ///
    /// Returns `KhaltiError::Api` when the gateway rejects the request and
    /// `Http`/`Parse` for transport or decoding problems.
    pub async fn initiate(&self, request: &InitiateRequest) -> Result<InitiateResponse, KhaltiError> {
        let url = format!("{}/epayment/initiate/", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KhaltiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| KhaltiError::Parse(e.to_string()))
    }

    /// Look up the state of a payment session.
    ///
    /// # Errors
    ///
    /// Returns `KhaltiError::Api` when the gateway rejects the request and
    /// `Http`/`Parse` for transport or decoding problems.
    pub async fn lookup(&self, pidx: &str) -> Result<LookupResponse, KhaltiError> {
        let url = format!("{}/epayment/lookup/", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&LookupRequest { pidx })
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KhaltiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| KhaltiError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_deserialization() {
        let completed: PaymentStatus = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(completed, PaymentStatus::Completed);
        assert!(completed.is_completed());

        let canceled: PaymentStatus = serde_json::from_str("\"User canceled\"").unwrap();
        assert_eq!(canceled, PaymentStatus::UserCanceled);
        assert!(!canceled.is_completed());

        // Statuses we've never seen fold into Unknown instead of failing
        let novel: PaymentStatus = serde_json::from_str("\"On hold\"").unwrap();
        assert_eq!(novel, PaymentStatus::Unknown);
        assert!(!novel.is_completed());
    }

    #[test]
    fn test_lookup_response_deserialization() {
        let json = r#"{
            "pidx": "bZQLD9wRVWo4CdESSfuSsB",
            "total_amount": 450000,
            "status": "Completed",
            "transaction_id": "GFq9PFS7b2iYvL8Lir9oXe",
            "fee": 0,
            "refunded": false
        }"#;

        let parsed: LookupResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.pidx, "bZQLD9wRVWo4CdESSfuSsB");
        assert_eq!(parsed.status, PaymentStatus::Completed);
        assert_eq!(parsed.total_amount, Some(450_000));
    }

    #[test]
    fn test_initiate_request_serialization() {
        let request = InitiateRequest {
            return_url: "https://tunila.netlify.app/payment-verify".to_string(),
            website_url: "https://tunila.netlify.app".to_string(),
            amount: 450_000,
            purchase_order_id: "TUNILA_42".to_string(),
            purchase_order_name: "Tour Hoodie".to_string(),
            customer_info: CustomerInfo {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                phone: "9800000000".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount"], 450_000);
        assert_eq!(json["customer_info"]["phone"], "9800000000");
        assert_eq!(json["purchase_order_name"], "Tour Hoodie");
    }
}
