//! Payment transaction model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tunila_core::{MerchandiseId, TransactionId, TransactionStatus, UserId};

/// One payment session against the gateway.
///
/// `pidx` is the gateway's session id and the correlation key between the
/// initiate call and later verification; it is unique per transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub merch_id: MerchandiseId,
    pub buyer_id: UserId,
    pub artist_id: UserId,
    pub quantity: i32,
    /// Total charged, in paisa (minor units), as sent to the gateway.
    pub amount_paisa: i64,
    pub pidx: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}
