//! Payment transaction repository.
//!
//! Home of the one correctness-sensitive invariant in the system: a
//! transaction's stock hand-over happens exactly once. [`finalize`] runs the
//! whole decision inside a single database transaction with the transaction
//! row locked (`FOR UPDATE`), and the decrement itself is conditional
//! (`stock >= quantity`), so concurrent verifications of the same `pidx`
//! serialize on the row and stock can never go negative.
//!
//! [`finalize`]: TransactionRepository::finalize

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tunila_core::{MerchandiseId, TransactionId, TransactionStatus, UserId};

use super::RepositoryError;
use crate::models::Transaction;

const TX_COLUMNS: &str =
    "id, merch_id, buyer_id, artist_id, quantity, amount_paisa, pidx, status, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i32,
    merch_id: i32,
    buyer_id: i32,
    artist_id: i32,
    quantity: i32,
    amount_paisa: i64,
    pidx: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<Transaction, RepositoryError> {
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Transaction {
            id: TransactionId::new(self.id),
            merch_id: MerchandiseId::new(self.merch_id),
            buyer_id: UserId::new(self.buyer_id),
            artist_id: UserId::new(self.artist_id),
            quantity: self.quantity,
            amount_paisa: self.amount_paisa,
            pidx: self.pidx,
            status,
            created_at: self.created_at,
        })
    }
}

/// What verification did to a transaction.
#[derive(Debug)]
pub enum PurchaseOutcome {
    /// Stock handed over and the transaction flipped to `completed`.
    Completed(Transaction),
    /// A previous verification already completed this transaction; nothing
    /// was decremented this time.
    AlreadyCompleted(Transaction),
    /// The transaction had already failed; terminal, nothing changes.
    AlreadyFailed(Transaction),
    /// Stock ran out between initiation and verification; the transaction
    /// was flipped to `failed` and stock left untouched.
    InsufficientStock(Transaction),
}

/// Repository for payment transactions.
pub struct TransactionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionRepository<'a> {
    /// Create a new transaction repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a freshly-initiated payment session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the gateway handed out a
    /// `pidx` we already know - that would be a gateway bug worth surfacing.
    pub async fn create(
        &self,
        merch_id: MerchandiseId,
        buyer_id: UserId,
        artist_id: UserId,
        quantity: i32,
        amount_paisa: i64,
        pidx: &str,
    ) -> Result<Transaction, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "INSERT INTO transactions (merch_id, buyer_id, artist_id, quantity, amount_paisa, pidx)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TX_COLUMNS}"
        ))
        .bind(merch_id)
        .bind(buyer_id)
        .bind(artist_id)
        .bind(quantity)
        .bind(amount_paisa)
        .bind(pidx)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "duplicate pidx"))?;

        row.into_transaction()
    }

    /// Look up a transaction by its gateway session id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_pidx(&self, pidx: &str) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE pidx = $1"
        ))
        .bind(pidx)
        .fetch_optional(self.pool)
        .await?;

        row.map(TransactionRow::into_transaction).transpose()
    }

    /// Flip a still-initiated transaction to `failed`.
    ///
    /// Used when the gateway reports anything other than a completed payment.
    /// A transaction already in a terminal state is left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_failed_if_initiated(&self, pidx: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE transactions SET status = 'failed'
             WHERE pidx = $1 AND status = 'initiated'",
        )
        .bind(pidx)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Finalize a gateway-confirmed purchase.
    ///
    /// Runs entirely inside one database transaction:
    ///
    /// 1. lock the transaction row (`FOR UPDATE`) - concurrent verifications
    ///    of the same `pidx` queue up here;
    /// 2. short-circuit if a previous verification already reached a
    ///    terminal state;
    /// 3. conditionally decrement stock (`stock >= quantity` in the UPDATE's
    ///    WHERE clause - the atomic guard);
    /// 4. flip the status to `completed`, or to `failed` when the decrement
    ///    matched no row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no transaction has this `pidx`.
    pub async fn finalize(&self, pidx: &str) -> Result<PurchaseOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE pidx = $1 FOR UPDATE"
        ))
        .bind(pidx)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound);
        };
        let transaction = row.into_transaction()?;

        match transaction.status {
            TransactionStatus::Completed => {
                tx.commit().await?;
                return Ok(PurchaseOutcome::AlreadyCompleted(transaction));
            }
            TransactionStatus::Failed => {
                tx.commit().await?;
                return Ok(PurchaseOutcome::AlreadyFailed(transaction));
            }
            TransactionStatus::Initiated => {}
        }

        let decremented = sqlx::query(
            "UPDATE merchandise SET stock = stock - $1 WHERE id = $2 AND stock >= $1",
        )
        .bind(transaction.quantity)
        .bind(transaction.merch_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let next_status = if decremented > 0 {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Failed
        };

        // The state machine allows both moves from `initiated`; anything else
        // was short-circuited above.
        debug_assert!(transaction.status.can_transition_to(next_status));

        sqlx::query("UPDATE transactions SET status = $1 WHERE id = $2")
            .bind(next_status.to_string())
            .bind(transaction.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let finalized = Transaction {
            status: next_status,
            ..transaction
        };

        if decremented > 0 {
            Ok(PurchaseOutcome::Completed(finalized))
        } else {
            Ok(PurchaseOutcome::InsufficientStock(finalized))
        }
    }
}
