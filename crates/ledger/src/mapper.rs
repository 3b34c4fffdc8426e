//! Conversion between the [`Wallet`] aggregate and its flat table rows.
//!
//! [`to_record`] is total: any in-memory wallet can be flattened.
//! [`to_domain`] may fail, because stored rows re-enter the aggregate through
//! its own validation. A row that no longer satisfies a domain invariant is
//! reported as [`LedgerError::Mapping`] naming the wallet.
//!
//! Neither function performs I/O.

use crate::{
    ExpenseRecord, IncomeRecord, LedgerError, LedgerResult, Materialization, Money, Transfer,
    Wallet, WalletType,
    schema::{expense_records, income_records, transfers, wallets},
    util::{model_currency, model_money, parse_uuid},
};

/// One wallet header row plus its dependent rows.
///
/// For a [`Materialization::PartialHeader`] record the child vectors are
/// always empty and must be read as "not loaded".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletRecord {
    pub wallet: wallets::Model,
    pub materialization: Materialization,
    pub income_records: Vec<income_records::Model>,
    pub expense_records: Vec<expense_records::Model>,
    pub transfers: Vec<transfers::Model>,
}

impl WalletRecord {
    /// A header-only record.
    pub fn header(wallet: wallets::Model) -> Self {
        Self {
            wallet,
            materialization: Materialization::PartialHeader,
            income_records: Vec::new(),
            expense_records: Vec::new(),
            transfers: Vec::new(),
        }
    }

    pub fn wallet_id(&self) -> &str {
        &self.wallet.id
    }
}

/// Flattens a wallet into rows.
pub fn to_record(wallet: &Wallet) -> WalletRecord {
    let balance = wallet.balance();
    WalletRecord {
        wallet: wallets::Model {
            id: wallet.id.to_string(),
            user_id: wallet.user_id.clone(),
            name: wallet.name.clone(),
            wallet_type: wallet.wallet_type.as_str().to_string(),
            currency: wallet.currency().code().to_string(),
            balance_amount: balance.amount_minor(),
            balance_currency: balance.currency().code().to_string(),
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
            version: wallet.version(),
        },
        materialization: wallet.materialization(),
        income_records: wallet
            .income_records()
            .unwrap_or_default()
            .iter()
            .map(income_records::Model::from)
            .collect(),
        expense_records: wallet
            .expense_records()
            .unwrap_or_default()
            .iter()
            .map(expense_records::Model::from)
            .collect(),
        transfers: wallet
            .transfers()
            .unwrap_or_default()
            .iter()
            .map(transfers::Model::from)
            .collect(),
    }
}

/// Rebuilds a wallet from rows, replaying every child row through the
/// aggregate's validation. Child order is preserved.
pub fn to_domain(record: WalletRecord) -> LedgerResult<Wallet> {
    let wallet_id = record.wallet.id.clone();
    rebuild(record).map_err(LedgerError::mapping(wallet_id))
}

fn rebuild(record: WalletRecord) -> LedgerResult<Wallet> {
    let WalletRecord {
        wallet: header,
        materialization,
        income_records,
        expense_records,
        transfers,
    } = record;

    if materialization == Materialization::PartialHeader
        && !(income_records.is_empty() && expense_records.is_empty() && transfers.is_empty())
    {
        return Err(LedgerError::InvalidRecord(
            "header-only record carries dependent rows".to_string(),
        ));
    }

    let version = header.version;
    let mut wallet = Wallet::from_storage(Wallet::try_from(header)?, version, materialization);

    for row in income_records {
        wallet.restore_income(IncomeRecord::try_from(row)?)?;
    }
    for row in expense_records {
        wallet.restore_expense(ExpenseRecord::try_from(row)?)?;
    }
    for row in transfers {
        wallet.restore_transfer(Transfer::try_from(row)?)?;
    }

    Ok(wallet)
}

impl TryFrom<wallets::Model> for Wallet {
    type Error = LedgerError;

    fn try_from(model: wallets::Model) -> Result<Self, Self::Error> {
        let currency = model_currency(&model.currency)?;
        let balance = model_money(model.balance_amount, &model.balance_currency)?;
        if balance.currency() != currency {
            return Err(LedgerError::CurrencyMismatch(format!(
                "wallet currency is {currency}, balance is in {}",
                balance.currency()
            )));
        }

        Ok(Wallet::with_id(
            parse_uuid(&model.id, "wallet")?,
            model.user_id,
            model.name,
            WalletType::try_from(model.wallet_type.as_str())?,
            balance,
            model.created_at,
            model.updated_at,
        ))
    }
}

impl From<&IncomeRecord> for income_records::Model {
    fn from(record: &IncomeRecord) -> Self {
        Self {
            id: record.id.to_string(),
            wallet_id: record.wallet_id.to_string(),
            category_id: record.subcategory_id.to_string(),
            amount: record.amount.amount_minor(),
            currency: record.amount.currency().code().to_string(),
            description: record.description.clone(),
            date: record.date,
            created_at: record.created_at,
        }
    }
}

impl TryFrom<income_records::Model> for IncomeRecord {
    type Error = LedgerError;

    fn try_from(model: income_records::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "income record")?,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            subcategory_id: parse_uuid(&model.category_id, "category")?,
            amount: model_money(model.amount, &model.currency)?,
            description: model.description,
            date: model.date,
            created_at: model.created_at,
        })
    }
}

impl From<&ExpenseRecord> for expense_records::Model {
    fn from(record: &ExpenseRecord) -> Self {
        Self {
            id: record.id.to_string(),
            wallet_id: record.wallet_id.to_string(),
            category_id: record.subcategory_id.to_string(),
            amount: record.amount.amount_minor(),
            currency: record.amount.currency().code().to_string(),
            description: record.description.clone(),
            date: record.date,
            created_at: record.created_at,
        }
    }
}

impl TryFrom<expense_records::Model> for ExpenseRecord {
    type Error = LedgerError;

    fn try_from(model: expense_records::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense record")?,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            subcategory_id: parse_uuid(&model.category_id, "category")?,
            amount: model_money(model.amount, &model.currency)?,
            description: model.description,
            date: model.date,
            created_at: model.created_at,
        })
    }
}

impl From<&Transfer> for transfers::Model {
    fn from(transfer: &Transfer) -> Self {
        Self {
            id: transfer.id.to_string(),
            from_wallet_id: transfer.from_wallet_id.to_string(),
            to_wallet_id: transfer.to_wallet_id.to_string(),
            amount: transfer.amount.amount_minor(),
            currency: transfer.amount.currency().code().to_string(),
            fee_amount: transfer.fee.amount_minor(),
            description: transfer.description.clone(),
            date: transfer.date,
            created_at: transfer.created_at,
        }
    }
}

impl TryFrom<transfers::Model> for Transfer {
    type Error = LedgerError;

    fn try_from(model: transfers::Model) -> Result<Self, Self::Error> {
        let amount = model_money(model.amount, &model.currency)?;
        Ok(Self {
            id: parse_uuid(&model.id, "transfer")?,
            from_wallet_id: parse_uuid(&model.from_wallet_id, "wallet")?,
            to_wallet_id: parse_uuid(&model.to_wallet_id, "wallet")?,
            amount,
            fee: Money::new(model.fee_amount, amount.currency()),
            description: model.description,
            date: model.date,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::Currency;

    fn usd(amount: i64) -> Money {
        Money::new(amount, Currency::Usd)
    }

    fn full_wallet() -> Wallet {
        let day = |d| Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap();
        let mut wallet = Wallet::with_id(
            Uuid::new_v4(),
            String::from("alice"),
            String::from("Checking"),
            WalletType::Bank,
            usd(10_000),
            day(1),
            day(1),
        );
        let category = Uuid::new_v4();
        wallet
            .add_income(IncomeRecord::new(
                wallet.id,
                category,
                usd(3_000),
                String::from("Salary"),
                day(2),
            ))
            .unwrap();
        wallet
            .add_expense(ExpenseRecord::new(
                wallet.id,
                category,
                usd(120),
                String::from("Books"),
                day(3),
            ))
            .unwrap();
        wallet
            .add_expense(ExpenseRecord::new(
                wallet.id,
                category,
                usd(80),
                String::from("Lunch"),
                day(4),
            ))
            .unwrap();
        wallet
            .add_transfer(Transfer::new(
                wallet.id,
                Uuid::new_v4(),
                usd(500),
                usd(5),
                String::from("Savings"),
                day(5),
            ))
            .unwrap();
        wallet
    }

    #[test]
    fn full_wallet_round_trips() {
        let wallet = full_wallet();
        let restored = to_domain(to_record(&wallet)).unwrap();

        assert_eq!(restored, wallet);
        assert_eq!(restored.balance(), usd(12_295));
    }

    #[test]
    fn record_mirrors_header_columns() {
        let wallet = full_wallet();
        let record = to_record(&wallet);

        assert_eq!(record.wallet.id, wallet.id.to_string());
        assert_eq!(record.wallet.wallet_type, "BANK");
        assert_eq!(record.wallet.currency, "USD");
        assert_eq!(record.wallet.balance_currency, "USD");
        assert_eq!(record.wallet.balance_amount, wallet.balance().amount_minor());
        assert_eq!(record.materialization, Materialization::FullAggregate);
        assert_eq!(record.expense_records.len(), 2);
        assert_eq!(record.expense_records[0].description, "Books");
        assert_eq!(record.transfers[0].fee_amount, 5);
    }

    #[test]
    fn partial_wallet_flattens_without_children() {
        let record = to_record(&full_wallet());
        let partial = to_domain(WalletRecord::header(record.wallet.clone())).unwrap();
        let flattened = to_record(&partial);

        assert_eq!(partial.materialization(), Materialization::PartialHeader);
        assert_eq!(flattened.materialization, Materialization::PartialHeader);
        assert!(flattened.income_records.is_empty());
        assert_eq!(flattened.wallet, record.wallet);
    }

    #[test]
    fn header_record_with_children_is_rejected() {
        let mut record = to_record(&full_wallet());
        record.materialization = Materialization::PartialHeader;

        assert!(matches!(
            to_domain(record),
            Err(LedgerError::Mapping { .. })
        ));
    }

    #[test]
    fn invalid_child_row_names_wallet() {
        let mut record = to_record(&full_wallet());
        record.expense_records[1].amount = -80;
        let wallet_id = record.wallet.id.clone();

        let err = to_domain(record).unwrap_err();
        match err {
            LedgerError::Mapping {
                wallet_id: failed,
                source,
            } => {
                assert_eq!(failed, wallet_id);
                assert!(matches!(*source, LedgerError::InvalidAmount(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mismatched_balance_currency_is_rejected() {
        let mut record = to_record(&full_wallet());
        record.wallet.balance_currency = String::from("EUR");

        assert!(to_domain(record).is_err());
    }
}
