//! Use-case facing access to wallet aggregates.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    LedgerResult, Wallet, mapper,
    store::{ReconcilePolicies, SqlWalletStore, WalletStore},
};

/// Loads and persists whole wallet aggregates.
///
/// A missing wallet is `Ok(None)` (or an empty vector), never an error.
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Persists the current state of `wallet` atomically. On success the
    /// wallet's version is advanced to the stored one.
    async fn save(&self, wallet: &mut Wallet) -> LedgerResult<()>;

    /// Header-only load. The returned wallet is a
    /// [`PartialHeader`](crate::Materialization::PartialHeader).
    async fn find_by_id(&self, id: Uuid) -> LedgerResult<Option<Wallet>>;

    /// Loads the wallet with every income record, expense record and transfer,
    /// most recent first.
    async fn find_by_id_with_transactions(&self, id: Uuid) -> LedgerResult<Option<Wallet>>;

    /// Header-only load of every wallet owned by `user_id`.
    async fn find_by_user_id(&self, user_id: &str) -> LedgerResult<Vec<Wallet>>;

    /// Removes the wallet and its dependent rows. Idempotent.
    async fn delete(&self, id: Uuid) -> LedgerResult<()>;
}

/// [`WalletRepository`] backed by any [`WalletStore`].
#[derive(Clone, Debug)]
pub struct Ledger<S> {
    store: S,
}

impl<S: WalletStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl Ledger<SqlWalletStore> {
    /// Return a builder for a SQL-backed `Ledger`.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }
}

#[async_trait]
impl<S: WalletStore> WalletRepository for Ledger<S> {
    async fn save(&self, wallet: &mut Wallet) -> LedgerResult<()> {
        let record = mapper::to_record(wallet);
        let version = self.store.save(&record).await?;
        wallet.set_version(version);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> LedgerResult<Option<Wallet>> {
        self.store
            .find_header(id)
            .await?
            .map(mapper::to_domain)
            .transpose()
    }

    async fn find_by_id_with_transactions(&self, id: Uuid) -> LedgerResult<Option<Wallet>> {
        self.store
            .find_full(id)
            .await?
            .map(mapper::to_domain)
            .transpose()
    }

    async fn find_by_user_id(&self, user_id: &str) -> LedgerResult<Vec<Wallet>> {
        self.store
            .find_headers_by_user(user_id)
            .await?
            .into_iter()
            .map(mapper::to_domain)
            .collect()
    }

    async fn delete(&self, id: Uuid) -> LedgerResult<()> {
        self.store.delete(id).await?;
        tracing::debug!("wallet {id} deleted");
        Ok(())
    }
}

/// The builder for a SQL-backed [`Ledger`].
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
    policies: ReconcilePolicies,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Override how child tables are reconciled on save.
    pub fn policies(mut self, policies: ReconcilePolicies) -> LedgerBuilder {
        self.policies = policies;
        self
    }

    /// Construct `Ledger`, checking the database is reachable.
    pub async fn build(self) -> LedgerResult<Ledger<SqlWalletStore>> {
        self.database.ping().await?;
        Ok(Ledger::new(SqlWalletStore::new(self.database, self.policies)))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        Currency, ExpenseRecord, LedgerError, Materialization, Money, WalletType,
        mapper::WalletRecord,
    };

    /// Keeps the last saved record per wallet.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<String, WalletRecord>>,
    }

    #[async_trait]
    impl WalletStore for MemoryStore {
        async fn save(&self, record: &WalletRecord) -> LedgerResult<i64> {
            let mut rows = self.rows.lock().unwrap();
            let found = rows.get(record.wallet_id()).map_or(0, |r| r.wallet.version);
            if found != record.wallet.version {
                return Err(LedgerError::Conflict {
                    wallet_id: record.wallet.id.clone(),
                    expected: record.wallet.version,
                    found,
                });
            }
            let mut stored = match (record.materialization, rows.get(record.wallet_id())) {
                (Materialization::PartialHeader, Some(previous)) => WalletRecord {
                    wallet: record.wallet.clone(),
                    ..previous.clone()
                },
                _ => record.clone(),
            };
            stored.materialization = Materialization::FullAggregate;
            stored.wallet.version = found + 1;
            rows.insert(record.wallet.id.clone(), stored);
            Ok(found + 1)
        }

        async fn find_header(&self, id: Uuid) -> LedgerResult<Option<WalletRecord>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .get(&id.to_string())
                .map(|r| WalletRecord::header(r.wallet.clone())))
        }

        async fn find_full(&self, id: Uuid) -> LedgerResult<Option<WalletRecord>> {
            Ok(self.rows.lock().unwrap().get(&id.to_string()).cloned())
        }

        async fn find_headers_by_user(&self, user_id: &str) -> LedgerResult<Vec<WalletRecord>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .values()
                .filter(|r| r.wallet.user_id == user_id)
                .map(|r| WalletRecord::header(r.wallet.clone()))
                .collect())
        }

        async fn delete(&self, id: Uuid) -> LedgerResult<()> {
            self.rows.lock().unwrap().remove(&id.to_string());
            Ok(())
        }
    }

    fn wallet() -> Wallet {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        Wallet::with_id(
            Uuid::new_v4(),
            String::from("alice"),
            String::from("Cash"),
            WalletType::Cash,
            Money::new(10_000, Currency::Usd),
            at,
            at,
        )
    }

    fn expense(wallet: &Wallet, amount: i64) -> ExpenseRecord {
        ExpenseRecord::new(
            wallet.id,
            Uuid::new_v4(),
            Money::new(amount, Currency::Usd),
            String::from("Coffee"),
            Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn save_advances_version() {
        let ledger = Ledger::new(MemoryStore::default());
        let mut wallet = wallet();

        ledger.save(&mut wallet).await.unwrap();
        assert_eq!(wallet.version(), 1);
        ledger.save(&mut wallet).await.unwrap();
        assert_eq!(wallet.version(), 2);
    }

    #[tokio::test]
    async fn find_by_id_is_header_only() {
        let ledger = Ledger::new(MemoryStore::default());
        let mut wallet = wallet();
        let record = expense(&wallet, 500);
        wallet.add_expense(record).unwrap();
        ledger.save(&mut wallet).await.unwrap();

        let partial = ledger.find_by_id(wallet.id).await.unwrap().unwrap();
        assert_eq!(partial.materialization(), Materialization::PartialHeader);
        assert_eq!(partial.expense_records(), None);
        assert_eq!(partial.balance(), Money::new(9_500, Currency::Usd));

        let full = ledger
            .find_by_id_with_transactions(wallet.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(full, wallet);
    }

    #[tokio::test]
    async fn stale_wallet_is_rejected() {
        let ledger = Ledger::new(MemoryStore::default());
        let mut wallet = wallet();
        ledger.save(&mut wallet).await.unwrap();

        let mut first = ledger.find_by_id(wallet.id).await.unwrap().unwrap();
        let mut second = first.clone();
        ledger.save(&mut first).await.unwrap();

        let err = ledger.save(&mut second).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Conflict {
                wallet_id: wallet.id.to_string(),
                expected: 1,
                found: 2,
            }
        );
        assert_eq!(second.version(), 1);
    }

    #[tokio::test]
    async fn corrupted_rows_fail_with_wallet_id() {
        let store = MemoryStore::default();
        let mut wallet = wallet();
        wallet.add_expense(expense(&wallet, 500)).unwrap();
        let mut record = mapper::to_record(&wallet);
        record.expense_records[0].currency = String::from("EUR");
        store.save(&record).await.unwrap();
        let ledger = Ledger::new(store);

        let err = ledger
            .find_by_id_with_transactions(wallet.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Mapping { ref wallet_id, .. } if *wallet_id == wallet.id.to_string()
        ));
    }

    #[tokio::test]
    async fn missing_wallets_are_not_errors() {
        let ledger = Ledger::new(MemoryStore::default());

        assert_eq!(ledger.find_by_id(Uuid::new_v4()).await.unwrap(), None);
        assert_eq!(
            ledger
                .find_by_id_with_transactions(Uuid::new_v4())
                .await
                .unwrap(),
            None
        );
        assert!(ledger.find_by_user_id("nobody").await.unwrap().is_empty());
        ledger.delete(Uuid::new_v4()).await.unwrap();
    }
}
