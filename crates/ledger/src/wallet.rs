//! The module contains the `Wallet` aggregate and its implementation.
//!
//! A wallet owns its income records, its expense records and the transfers in
//! which it is either the source or the destination. The aggregate knows how
//! much of itself is in memory: a [`Materialization::PartialHeader`] wallet
//! carries only its own columns and its collections are *unknown*, not empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, ExpenseRecord, IncomeRecord, LedgerError, LedgerResult, Money, Transfer,
    TransferSide,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletType {
    Cash,
    Bank,
    Credit,
    Investment,
}

impl WalletType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
            Self::Credit => "CREDIT",
            Self::Investment => "INVESTMENT",
        }
    }
}

impl TryFrom<&str> for WalletType {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "CASH" => Ok(Self::Cash),
            "BANK" => Ok(Self::Bank),
            "CREDIT" => Ok(Self::Credit),
            "INVESTMENT" => Ok(Self::Investment),
            other => Err(LedgerError::InvalidRecord(format!(
                "invalid wallet type: {other}"
            ))),
        }
    }
}

/// How much of the aggregate is in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialization {
    /// Only the wallet's own columns were loaded.
    PartialHeader,
    /// The wallet and every dependent entry were loaded (or the wallet is new).
    FullAggregate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Entries {
    income_records: Vec<IncomeRecord>,
    expense_records: Vec<ExpenseRecord>,
    transfers: Vec<Transfer>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Contents {
    PartialHeader,
    FullAggregate(Entries),
}

/// A wallet: cash, a bank account, a credit line or an investment account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub wallet_type: WalletType,
    balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    version: i64,
    contents: Contents,
}

impl Wallet {
    /// Creates a brand-new wallet. Nothing is persisted for it yet, so it is
    /// fully loaded with empty collections.
    pub fn new(user_id: String, name: String, wallet_type: WalletType, balance: Money) -> Self {
        let now = Utc::now();
        Self::with_id(
            Uuid::new_v4(),
            user_id,
            name,
            wallet_type,
            balance,
            now,
            now,
        )
    }

    pub fn with_id(
        id: Uuid,
        user_id: String,
        name: String,
        wallet_type: WalletType,
        balance: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            name,
            wallet_type,
            balance,
            created_at,
            updated_at,
            version: 0,
            contents: Contents::FullAggregate(Entries::default()),
        }
    }

    /// Rebuilds a wallet header read from storage.
    pub(crate) fn from_storage(
        header: Wallet,
        version: i64,
        materialization: Materialization,
    ) -> Self {
        let contents = match materialization {
            Materialization::PartialHeader => Contents::PartialHeader,
            Materialization::FullAggregate => Contents::FullAggregate(Entries::default()),
        };
        Self {
            version,
            contents,
            ..header
        }
    }

    #[must_use]
    pub fn balance(&self) -> Money {
        self.balance
    }

    #[must_use]
    pub fn currency(&self) -> Currency {
        self.balance.currency()
    }

    /// Optimistic concurrency counter: the number of successful saves.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    #[must_use]
    pub fn materialization(&self) -> Materialization {
        match self.contents {
            Contents::PartialHeader => Materialization::PartialHeader,
            Contents::FullAggregate(_) => Materialization::FullAggregate,
        }
    }

    #[must_use]
    pub fn is_fully_loaded(&self) -> bool {
        self.materialization() == Materialization::FullAggregate
    }

    /// Income records, or `None` when the wallet was loaded header-only.
    #[must_use]
    pub fn income_records(&self) -> Option<&[IncomeRecord]> {
        match &self.contents {
            Contents::PartialHeader => None,
            Contents::FullAggregate(entries) => Some(&entries.income_records),
        }
    }

    /// Expense records, or `None` when the wallet was loaded header-only.
    #[must_use]
    pub fn expense_records(&self) -> Option<&[ExpenseRecord]> {
        match &self.contents {
            Contents::PartialHeader => None,
            Contents::FullAggregate(entries) => Some(&entries.expense_records),
        }
    }

    /// Transfers from or to this wallet, or `None` when the wallet was loaded
    /// header-only.
    #[must_use]
    pub fn transfers(&self) -> Option<&[Transfer]> {
        match &self.contents {
            Contents::PartialHeader => None,
            Contents::FullAggregate(entries) => Some(&entries.transfers),
        }
    }

    pub fn rename(&mut self, name: &str) -> LedgerResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidRecord(
                "wallet name must not be empty".to_string(),
            ));
        }
        self.name = trimmed.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records an income and credits the balance.
    pub fn add_income(&mut self, record: IncomeRecord) -> LedgerResult<()> {
        self.check_income(&record)?;
        let balance = self.balance.checked_add(record.amount)?;
        self.entries_mut()?.income_records.push(record);
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records an expense and debits the balance.
    pub fn add_expense(&mut self, record: ExpenseRecord) -> LedgerResult<()> {
        self.check_expense(&record)?;
        let balance = self.balance.checked_sub(record.amount)?;
        self.entries_mut()?.expense_records.push(record);
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records a transfer touching this wallet. The source pays amount plus
    /// fee, the destination receives the amount.
    ///
    /// Only this wallet's currency is checked here; the other endpoint's is
    /// checked when the transfer is saved.
    pub fn add_transfer(&mut self, transfer: Transfer) -> LedgerResult<()> {
        let side = self.check_transfer(&transfer)?;
        let balance = match side {
            TransferSide::Outgoing => self
                .balance
                .checked_sub(transfer.amount.checked_add(transfer.fee)?)?,
            TransferSide::Incoming => self.balance.checked_add(transfer.amount)?,
        };
        self.entries_mut()?.transfers.push(transfer);
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes an income record and takes its amount back off the balance.
    pub fn remove_income(&mut self, id: Uuid) -> LedgerResult<IncomeRecord> {
        let entries = self.entries()?;
        let index = entries
            .income_records
            .iter()
            .position(|r| r.id == id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        let balance = self
            .balance
            .checked_sub(entries.income_records[index].amount)?;

        let record = self.entries_mut()?.income_records.remove(index);
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(record)
    }

    /// Removes an expense record and gives its amount back to the balance.
    pub fn remove_expense(&mut self, id: Uuid) -> LedgerResult<ExpenseRecord> {
        let entries = self.entries()?;
        let index = entries
            .expense_records
            .iter()
            .position(|r| r.id == id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        let balance = self
            .balance
            .checked_add(entries.expense_records[index].amount)?;

        let record = self.entries_mut()?.expense_records.remove(index);
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(record)
    }

    /// Removes a transfer and reverts its effect on this wallet.
    pub fn remove_transfer(&mut self, id: Uuid) -> LedgerResult<Transfer> {
        let entries = self.entries()?;
        let index = entries
            .transfers
            .iter()
            .position(|t| t.id == id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        let transfer = &entries.transfers[index];
        let balance = match transfer.side_of(self.id) {
            Some(TransferSide::Outgoing) => self
                .balance
                .checked_add(transfer.amount.checked_add(transfer.fee)?)?,
            Some(TransferSide::Incoming) => self.balance.checked_sub(transfer.amount)?,
            None => self.balance,
        };

        let transfer = self.entries_mut()?.transfers.remove(index);
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(transfer)
    }

    // Replays used when rebuilding from storage: same validation as the
    // `add_*` methods, balance untouched.

    pub(crate) fn restore_income(&mut self, record: IncomeRecord) -> LedgerResult<()> {
        self.check_income(&record)?;
        self.entries_mut()?.income_records.push(record);
        Ok(())
    }

    pub(crate) fn restore_expense(&mut self, record: ExpenseRecord) -> LedgerResult<()> {
        self.check_expense(&record)?;
        self.entries_mut()?.expense_records.push(record);
        Ok(())
    }

    pub(crate) fn restore_transfer(&mut self, transfer: Transfer) -> LedgerResult<()> {
        self.check_transfer(&transfer)?;
        self.entries_mut()?.transfers.push(transfer);
        Ok(())
    }

    fn entries(&self) -> LedgerResult<&Entries> {
        match &self.contents {
            Contents::PartialHeader => Err(LedgerError::NotFullyLoaded(self.id)),
            Contents::FullAggregate(entries) => Ok(entries),
        }
    }

    fn entries_mut(&mut self) -> LedgerResult<&mut Entries> {
        match &mut self.contents {
            Contents::PartialHeader => Err(LedgerError::NotFullyLoaded(self.id)),
            Contents::FullAggregate(entries) => Ok(entries),
        }
    }

    fn check_income(&self, record: &IncomeRecord) -> LedgerResult<()> {
        let entries = self.entries()?;
        self.check_owner("income record", record.id, record.wallet_id)?;
        self.check_amount("income record", record.id, record.amount)?;
        if entries.income_records.iter().any(|r| r.id == record.id) {
            return Err(LedgerError::DuplicateEntry(record.id));
        }
        Ok(())
    }

    fn check_expense(&self, record: &ExpenseRecord) -> LedgerResult<()> {
        let entries = self.entries()?;
        self.check_owner("expense record", record.id, record.wallet_id)?;
        self.check_amount("expense record", record.id, record.amount)?;
        if entries.expense_records.iter().any(|r| r.id == record.id) {
            return Err(LedgerError::DuplicateEntry(record.id));
        }
        Ok(())
    }

    fn check_owner(&self, kind: &str, id: Uuid, wallet_id: Uuid) -> LedgerResult<()> {
        if wallet_id != self.id {
            return Err(LedgerError::InvalidRecord(format!(
                "{kind} {id} belongs to wallet {wallet_id}, not {}",
                self.id
            )));
        }
        Ok(())
    }

    fn check_transfer(&self, transfer: &Transfer) -> LedgerResult<TransferSide> {
        let entries = self.entries()?;
        if transfer.from_wallet_id == transfer.to_wallet_id {
            return Err(LedgerError::InvalidRecord(format!(
                "transfer {} has the same source and destination",
                transfer.id
            )));
        }
        let side = transfer.side_of(self.id).ok_or_else(|| {
            LedgerError::InvalidRecord(format!(
                "transfer {} does not involve wallet {}",
                transfer.id, self.id
            ))
        })?;
        self.check_amount("transfer", transfer.id, transfer.amount)?;
        if transfer.fee.currency() != transfer.amount.currency() {
            return Err(LedgerError::CurrencyMismatch(format!(
                "transfer {} fee is in {}, amount in {}",
                transfer.id,
                transfer.fee.currency(),
                transfer.amount.currency()
            )));
        }
        if transfer.fee.is_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "transfer {} fee must be >= 0",
                transfer.id
            )));
        }
        if entries.transfers.iter().any(|t| t.id == transfer.id) {
            return Err(LedgerError::DuplicateEntry(transfer.id));
        }
        Ok(side)
    }

    fn check_amount(&self, kind: &str, id: Uuid, amount: Money) -> LedgerResult<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "{kind} {id} amount must be > 0"
            )));
        }
        if amount.currency() != self.currency() {
            return Err(LedgerError::CurrencyMismatch(format!(
                "wallet currency is {}, {kind} {id} is in {}",
                self.currency(),
                amount.currency()
            )));
        }
        Ok(())
    }
}
