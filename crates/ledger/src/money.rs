use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Currency, LedgerError, LedgerResult};

/// Signed money amount in **minor units** of its currency.
///
/// Use this type for **all** monetary values in the ledger (balances, entry
/// amounts, transfer fees) to avoid floating-point drift. Values are immutable:
/// arithmetic returns a new `Money` and refuses to mix currencies.
///
/// # Examples
///
/// ```rust
/// use ledger::{Currency, Money};
///
/// let amount = Money::new(12_34, Currency::Usd);
/// assert_eq!(amount.amount_minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34 USD");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more decimals than the currency has):
///
/// ```rust
/// use ledger::{Currency, Money};
///
/// assert_eq!(Money::parse("10,5", Currency::Eur).unwrap().amount_minor(), 1050);
/// assert!(Money::parse("12.345", Currency::Eur).is_err());
/// assert!(Money::parse("1.5", Currency::Jpy).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn amount_minor(self) -> i64 {
        self.amount_minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.amount_minor == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.amount_minor > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.amount_minor < 0
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(self, rhs: Money) -> LedgerResult<Money> {
        self.ensure_same_currency(rhs)?;
        self.amount_minor
            .checked_add(rhs.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| LedgerError::InvalidAmount("amount too large".to_string()))
    }

    /// Subtracts an amount of the same currency.
    pub fn checked_sub(self, rhs: Money) -> LedgerResult<Money> {
        self.ensure_same_currency(rhs)?;
        self.amount_minor
            .checked_sub(rhs.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| LedgerError::InvalidAmount("amount too large".to_string()))
    }

    fn ensure_same_currency(self, rhs: Money) -> LedgerResult<()> {
        if self.currency != rhs.currency {
            return Err(LedgerError::CurrencyMismatch(format!(
                "expected {}, got {}",
                self.currency, rhs.currency
            )));
        }
        Ok(())
    }

    /// Parses a decimal string in major units into minor units of `currency`.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    pub fn parse(s: &str, currency: Currency) -> LedgerResult<Money> {
        let empty = || LedgerError::InvalidAmount("empty amount".to_string());
        let invalid = || LedgerError::InvalidAmount("invalid amount".to_string());
        let overflow = || LedgerError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(empty());
        }

        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next().unwrap_or("");
        if parts.next().is_some() {
            return Err(invalid());
        }

        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if major_str.is_empty() || !is_digits(major_str) || !is_digits(frac_str) {
            return Err(invalid());
        }

        let digits = u32::from(currency.minor_units());
        if frac_str.len() > digits as usize {
            return Err(LedgerError::InvalidAmount("too many decimals".to_string()));
        }

        let scale = 10i64.pow(digits);
        let major: i64 = major_str.parse().map_err(|_| overflow())?;
        let minor: i64 = if frac_str.is_empty() {
            0
        } else {
            let padding = 10i64.pow(digits - frac_str.len() as u32);
            frac_str.parse::<i64>().map_err(|_| invalid())? * padding
        };

        let total = major
            .checked_mul(scale)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;
        let signed = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money::new(signed, currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        let digits = u32::from(self.currency.minor_units());
        if digits == 0 {
            return write!(f, "{sign}{abs} {}", self.currency);
        }
        let scale = 10u64.pow(digits);
        let width = digits as usize;
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / scale,
            abs % scale,
            self.currency
        )
    }
}
