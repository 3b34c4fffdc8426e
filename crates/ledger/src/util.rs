//! Internal helpers for row validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! parsing of stored values so every table is decoded with the same rules.

use uuid::Uuid;

use crate::{Currency, LedgerError, LedgerResult, Money};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> LedgerResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| LedgerError::InvalidId(format!("invalid {label} id: {value}")))
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> LedgerResult<Currency> {
    Currency::try_from(value)
        .map_err(|_| LedgerError::InvalidCurrency(format!("invalid stored currency: {value}")))
}

/// Build a `Money` from a stored amount and currency code.
pub(crate) fn model_money(amount_minor: i64, currency: &str) -> LedgerResult<Money> {
    Ok(Money::new(amount_minor, model_currency(currency)?))
}
