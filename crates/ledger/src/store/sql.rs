use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    LedgerError, LedgerResult, Materialization, TxPhase,
    mapper::WalletRecord,
    schema::{expense_records, income_records, transfers, wallets},
};

use super::{ReconcilePolicies, ReconcilePolicy, WalletStore};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The rollback is explicit so it can be logged; a transaction dropped on an
/// unexpected exit path is rolled back by sea-orm as well.
macro_rules! with_tx {
    ($db:expr, |$tx:ident| $body:expr) => {{
        let $tx = $db
            .begin()
            .await
            .map_err(LedgerError::transaction(TxPhase::Begin))?;
        let result: LedgerResult<_> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err(LedgerError::transaction(TxPhase::Commit))?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!("rolling back transaction: {err}");
                if let Err(rollback_err) = $tx.rollback().await {
                    let err = LedgerError::transaction(TxPhase::Rollback)(rollback_err);
                    tracing::error!("{err}");
                }
                Err(err)
            }
        }
    }};
}

/// Insert child rows one at a time so a failure names the offending row.
/// Evaluates to the number of rows written.
macro_rules! insert_rows {
    ($tx:expr, $table:ident, $rows:expr, $label:literal, $policy:expr) => {{
        let mut written = 0u64;
        for row in $rows {
            let mut insert =
                $table::Entity::insert($table::ActiveModel::from(row.clone()).reset_all());
            if $policy == ReconcilePolicy::AppendOnly {
                insert = insert
                    .on_conflict(OnConflict::column($table::Column::Id).do_nothing().to_owned());
            }
            written += insert
                .exec_without_returning($tx)
                .await
                .map_err(LedgerError::statement("save", $label, &row.id))?;
        }
        written
    }};
}

/// Relational [`WalletStore`] over a sea-orm connection.
///
/// Saving opens one transaction: the header is written only if its stored
/// version is still the one the aggregate was loaded with, then each child
/// table is reconciled with its [`ReconcilePolicy`]. Header-only records never
/// touch child tables.
#[derive(Clone, Debug)]
pub struct SqlWalletStore {
    database: DatabaseConnection,
    policies: ReconcilePolicies,
}

impl SqlWalletStore {
    pub fn new(database: DatabaseConnection, policies: ReconcilePolicies) -> Self {
        Self { database, policies }
    }

    pub fn policies(&self) -> ReconcilePolicies {
        self.policies
    }

    async fn write_aggregate(
        &self,
        tx: &DatabaseTransaction,
        record: &WalletRecord,
    ) -> LedgerResult<i64> {
        let version = self.write_header(tx, &record.wallet).await?;

        if record.materialization == Materialization::FullAggregate {
            self.reconcile_income(tx, record).await?;
            self.reconcile_expenses(tx, record).await?;
            self.reconcile_transfers(tx, record).await?;
        }

        Ok(version)
    }

    /// Writes the header only if the stored version still equals the one the
    /// aggregate was loaded with. Version 0 means "not stored yet".
    async fn write_header(
        &self,
        tx: &DatabaseTransaction,
        header: &wallets::Model,
    ) -> LedgerResult<i64> {
        let expected = header.version;
        let row = wallets::Model {
            version: expected + 1,
            ..header.clone()
        };

        let written = if expected == 0 {
            wallets::Entity::insert(wallets::ActiveModel::from(row).reset_all())
                .on_conflict(OnConflict::column(wallets::Column::Id).do_nothing().to_owned())
                .exec_without_returning(tx)
                .await
                .map_err(LedgerError::statement("save", "wallet", &header.id))?
        } else {
            let mut changes = wallets::ActiveModel::from(row).reset_all();
            changes.id = ActiveValue::NotSet;
            changes.user_id = ActiveValue::NotSet;
            changes.created_at = ActiveValue::NotSet;
            wallets::Entity::update_many()
                .set(changes)
                .filter(wallets::Column::Id.eq(header.id.as_str()))
                .filter(wallets::Column::Version.eq(expected))
                .exec(tx)
                .await
                .map_err(LedgerError::statement("save", "wallet", &header.id))?
                .rows_affected
        };

        if written == 0 {
            let found = stored_version(tx, &header.id).await?;
            tracing::warn!(
                "stale save of wallet {}: loaded version {expected}, stored version {found}",
                header.id
            );
            return Err(LedgerError::Conflict {
                wallet_id: header.id.clone(),
                expected,
                found,
            });
        }
        Ok(expected + 1)
    }

    async fn reconcile_income(
        &self,
        tx: &DatabaseTransaction,
        record: &WalletRecord,
    ) -> LedgerResult<()> {
        let wallet_id = record.wallet_id();
        let policy = self.policies.income_records;

        let removed = if policy == ReconcilePolicy::ReplaceAll {
            income_records::Entity::delete_many()
                .filter(income_records::Column::WalletId.eq(wallet_id))
                .exec(tx)
                .await
                .map_err(LedgerError::statement("clear", "income records of wallet", wallet_id))?
                .rows_affected
        } else {
            0
        };
        let written = insert_rows!(
            tx,
            income_records,
            &record.income_records,
            "income record",
            policy
        );

        tracing::debug!("wallet {wallet_id}: income records -{removed} +{written} ({policy:?})");
        Ok(())
    }

    async fn reconcile_expenses(
        &self,
        tx: &DatabaseTransaction,
        record: &WalletRecord,
    ) -> LedgerResult<()> {
        let wallet_id = record.wallet_id();
        let policy = self.policies.expense_records;

        let removed = if policy == ReconcilePolicy::ReplaceAll {
            expense_records::Entity::delete_many()
                .filter(expense_records::Column::WalletId.eq(wallet_id))
                .exec(tx)
                .await
                .map_err(LedgerError::statement("clear", "expense records of wallet", wallet_id))?
                .rows_affected
        } else {
            0
        };
        let written = insert_rows!(
            tx,
            expense_records,
            &record.expense_records,
            "expense record",
            policy
        );

        tracing::debug!("wallet {wallet_id}: expense records -{removed} +{written} ({policy:?})");
        Ok(())
    }

    /// Transfer rows are shared with the other endpoint, so only rows that
    /// actually change are written, and every other wallet they name gets its
    /// version bumped. A stale copy of that wallet then fails with `Conflict`
    /// instead of overwriting the change.
    async fn reconcile_transfers(
        &self,
        tx: &DatabaseTransaction,
        record: &WalletRecord,
    ) -> LedgerResult<()> {
        let wallet_id = record.wallet_id();
        let policy = self.policies.transfers;

        let stored: HashMap<String, transfers::Model> = transfers::Entity::find()
            .filter(touches_wallet(wallet_id))
            .all(tx)
            .await
            .map_err(LedgerError::statement("load", "transfers of wallet", wallet_id))?
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();

        let mut inserted = Vec::new();
        let mut removed = Vec::new();
        for row in &record.transfers {
            match stored.get(&row.id) {
                None => inserted.push(row),
                Some(previous)
                    if previous != row && policy == ReconcilePolicy::ReplaceAll =>
                {
                    removed.push(previous);
                    inserted.push(row);
                }
                Some(_) => {}
            }
        }
        if policy == ReconcilePolicy::ReplaceAll {
            let kept: HashSet<&str> = record.transfers.iter().map(|r| r.id.as_str()).collect();
            removed.extend(stored.values().filter(|r| !kept.contains(r.id.as_str())));
        }

        check_counterpart_currency(tx, wallet_id, &inserted).await?;
        let others = counterparts(wallet_id, inserted.iter().chain(&removed).copied());

        if !removed.is_empty() {
            transfers::Entity::delete_many()
                .filter(transfers::Column::Id.is_in(removed.iter().map(|r| r.id.clone())))
                .exec(tx)
                .await
                .map_err(LedgerError::statement("clear", "transfers of wallet", wallet_id))?;
        }
        let written = insert_rows!(tx, transfers, inserted.iter().copied(), "transfer", policy);
        bump_versions(tx, &others).await?;

        tracing::debug!(
            "wallet {wallet_id}: transfers -{} +{written} ({policy:?}), bumped {others:?}",
            removed.len()
        );
        Ok(())
    }

    async fn read_children(
        &self,
        tx: &DatabaseTransaction,
        header: wallets::Model,
    ) -> LedgerResult<WalletRecord> {
        let wallet_id = header.id.as_str();

        let income_records = income_records::Entity::find()
            .filter(income_records::Column::WalletId.eq(wallet_id))
            .order_by_desc(income_records::Column::Date)
            .order_by_desc(income_records::Column::CreatedAt)
            .all(tx)
            .await
            .map_err(LedgerError::statement("load", "income records of wallet", wallet_id))?;

        let expense_records = expense_records::Entity::find()
            .filter(expense_records::Column::WalletId.eq(wallet_id))
            .order_by_desc(expense_records::Column::Date)
            .order_by_desc(expense_records::Column::CreatedAt)
            .all(tx)
            .await
            .map_err(LedgerError::statement("load", "expense records of wallet", wallet_id))?;

        let transfers = transfers::Entity::find()
            .filter(touches_wallet(wallet_id))
            .order_by_desc(transfers::Column::Date)
            .order_by_desc(transfers::Column::CreatedAt)
            .all(tx)
            .await
            .map_err(LedgerError::statement("load", "transfers of wallet", wallet_id))?;

        tracing::debug!(
            "loaded wallet {wallet_id}: {} income, {} expense, {} transfer rows",
            income_records.len(),
            expense_records.len(),
            transfers.len()
        );

        Ok(WalletRecord {
            wallet: header,
            materialization: Materialization::FullAggregate,
            income_records,
            expense_records,
            transfers,
        })
    }

    async fn delete_aggregate(&self, tx: &DatabaseTransaction, id: &str) -> LedgerResult<()> {
        let income = income_records::Entity::delete_many()
            .filter(income_records::Column::WalletId.eq(id))
            .exec(tx)
            .await
            .map_err(LedgerError::statement("delete", "income records of wallet", id))?;
        let expenses = expense_records::Entity::delete_many()
            .filter(expense_records::Column::WalletId.eq(id))
            .exec(tx)
            .await
            .map_err(LedgerError::statement("delete", "expense records of wallet", id))?;
        let shared = transfers::Entity::find()
            .filter(touches_wallet(id))
            .all(tx)
            .await
            .map_err(LedgerError::statement("load", "transfers of wallet", id))?;
        let others = counterparts(id, shared.iter());
        let transfers = transfers::Entity::delete_many()
            .filter(touches_wallet(id))
            .exec(tx)
            .await
            .map_err(LedgerError::statement("delete", "transfers of wallet", id))?;
        bump_versions(tx, &others).await?;
        let header = wallets::Entity::delete_by_id(id.to_string())
            .exec(tx)
            .await
            .map_err(LedgerError::statement("delete", "wallet", id))?;

        tracing::debug!(
            "deleted wallet {id}: {} header, {} income, {} expense, {} transfer rows",
            header.rows_affected,
            income.rows_affected,
            expenses.rows_affected,
            transfers.rows_affected
        );
        Ok(())
    }
}

/// Transfers are visible from both endpoints.
fn touches_wallet(wallet_id: &str) -> Condition {
    Condition::any()
        .add(transfers::Column::FromWalletId.eq(wallet_id))
        .add(transfers::Column::ToWalletId.eq(wallet_id))
}

/// The endpoints other than `wallet_id` named by `rows`.
fn counterparts<'a>(
    wallet_id: &str,
    rows: impl IntoIterator<Item = &'a transfers::Model>,
) -> BTreeSet<String> {
    rows.into_iter()
        .flat_map(|r| [&r.from_wallet_id, &r.to_wallet_id])
        .filter(|id| id.as_str() != wallet_id)
        .cloned()
        .collect()
}

async fn stored_version(tx: &DatabaseTransaction, wallet_id: &str) -> LedgerResult<i64> {
    Ok(wallets::Entity::find_by_id(wallet_id.to_string())
        .one(tx)
        .await
        .map_err(LedgerError::statement("read", "wallet", wallet_id))?
        .map_or(0, |row| row.version))
}

async fn bump_versions(
    tx: &DatabaseTransaction,
    wallet_ids: &BTreeSet<String>,
) -> LedgerResult<()> {
    if wallet_ids.is_empty() {
        return Ok(());
    }
    wallets::Entity::update_many()
        .col_expr(
            wallets::Column::Version,
            Expr::col(wallets::Column::Version).add(1),
        )
        .filter(wallets::Column::Id.is_in(wallet_ids.iter().cloned()))
        .exec(tx)
        .await
        .map_err(LedgerError::statement(
            "bump",
            "versions of wallets",
            format!("{wallet_ids:?}"),
        ))?;
    Ok(())
}

/// A transfer must be in the currency of both endpoints. Endpoints not stored
/// yet cannot be checked.
async fn check_counterpart_currency(
    tx: &DatabaseTransaction,
    wallet_id: &str,
    rows: &[&transfers::Model],
) -> LedgerResult<()> {
    let others = counterparts(wallet_id, rows.iter().copied());
    if others.is_empty() {
        return Ok(());
    }
    let currencies: HashMap<String, String> = wallets::Entity::find()
        .filter(wallets::Column::Id.is_in(others.iter().cloned()))
        .all(tx)
        .await
        .map_err(LedgerError::statement("read", "wallets", format!("{others:?}")))?
        .into_iter()
        .map(|w| (w.id, w.currency))
        .collect();

    for row in rows {
        let other = if row.from_wallet_id == wallet_id {
            &row.to_wallet_id
        } else {
            &row.from_wallet_id
        };
        match currencies.get(other) {
            Some(currency) if *currency != row.currency => {
                return Err(LedgerError::CurrencyMismatch(format!(
                    "transfer {} is in {}, wallet {other} holds {currency}",
                    row.id, row.currency
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

#[async_trait]
impl WalletStore for SqlWalletStore {
    async fn save(&self, record: &WalletRecord) -> LedgerResult<i64> {
        let version = with_tx!(self.database, |tx| self.write_aggregate(&tx, record).await)?;
        tracing::debug!("saved wallet {} at version {version}", record.wallet_id());
        Ok(version)
    }

    async fn find_header(&self, id: Uuid) -> LedgerResult<Option<WalletRecord>> {
        let header = wallets::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await
            .map_err(LedgerError::statement("load", "wallet", id))?;
        Ok(header.map(WalletRecord::header))
    }

    async fn find_full(&self, id: Uuid) -> LedgerResult<Option<WalletRecord>> {
        with_tx!(self.database, |tx| {
            match wallets::Entity::find_by_id(id.to_string())
                .one(&tx)
                .await
                .map_err(LedgerError::statement("load", "wallet", id))?
            {
                Some(header) => self.read_children(&tx, header).await.map(Some),
                None => Ok(None),
            }
        })
    }

    async fn find_headers_by_user(&self, user_id: &str) -> LedgerResult<Vec<WalletRecord>> {
        let headers = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .order_by_asc(wallets::Column::CreatedAt)
            .order_by_asc(wallets::Column::Id)
            .all(&self.database)
            .await
            .map_err(LedgerError::statement("load", "wallets of user", user_id))?;
        Ok(headers.into_iter().map(WalletRecord::header).collect())
    }

    async fn delete(&self, id: Uuid) -> LedgerResult<()> {
        let id = id.to_string();
        with_tx!(self.database, |tx| self.delete_aggregate(&tx, &id).await)
    }
}
