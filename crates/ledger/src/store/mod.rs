//! Persistence port for wallet aggregates.
//!
//! [`WalletStore`] speaks in flat [`WalletRecord`]s and knows nothing about
//! domain validation; [`Ledger`](crate::Ledger) sits on top of it and does the
//! mapping. [`SqlWalletStore`] is the relational implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerResult, mapper::WalletRecord};

pub use sql::SqlWalletStore;

mod sql;

/// How a child table is brought in line with the in-memory collection on save.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Make the stored rows of the wallet equal to the collection: rows missing
    /// from it are deleted, new or changed rows are written.
    ///
    /// Transfers also belong to the other endpoint. Whenever a save inserts,
    /// changes or deletes a transfer, the other wallet's version is bumped in
    /// the same transaction, so a copy of it loaded earlier fails to save with
    /// [`LedgerError::Conflict`](crate::LedgerError::Conflict) and must be
    /// reloaded. Without that, its save would delete the transfer again.
    #[default]
    ReplaceAll,
    /// Insert rows whose ID is not stored yet; never delete or overwrite.
    /// New transfers bump the other endpoint's version like
    /// [`ReplaceAll`](Self::ReplaceAll).
    AppendOnly,
}

/// Reconciliation policy per child table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicies {
    pub income_records: ReconcilePolicy,
    pub expense_records: ReconcilePolicy,
    pub transfers: ReconcilePolicy,
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Persists the record atomically and returns the stored version.
    ///
    /// Only the header is written for a header-only record. Fails with
    /// `Conflict` when the stored version moved on, and with
    /// `CurrencyMismatch` when a new transfer's other endpoint is stored in a
    /// different currency.
    async fn save(&self, record: &WalletRecord) -> LedgerResult<i64>;

    /// Loads the header row only.
    async fn find_header(&self, id: Uuid) -> LedgerResult<Option<WalletRecord>>;

    /// Loads the header and every dependent row, most recent first.
    async fn find_full(&self, id: Uuid) -> LedgerResult<Option<WalletRecord>>;

    /// Loads the header rows of every wallet owned by `user_id`.
    async fn find_headers_by_user(&self, user_id: &str) -> LedgerResult<Vec<WalletRecord>>;

    /// Removes the wallet and its dependent rows. Missing wallets are ignored.
    async fn delete(&self, id: Uuid) -> LedgerResult<()>;
}
