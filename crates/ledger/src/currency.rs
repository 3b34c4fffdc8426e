use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// ISO 4217 currency code used by wallets and their money values.
///
/// ## Minor units
///
/// The ledger stores monetary values as an `i64` number of **minor units** (see
/// [`Money`](crate::Money)). `minor_units()` returns how many decimal digits are
/// used when converting between:
/// - major units (human input/output, e.g. `10.50 USD`)
/// - minor units (stored integers, e.g. `1050`)
///
/// Example: USD has 2 minor units, so `10.50 USD` ⇄ `1050`; JPY has none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Jpy,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Jpy => "JPY",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Jpy => 0,
            Currency::Eur | Currency::Usd | Currency::Gbp | Currency::Chf => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "CHF" => Ok(Currency::Chf),
            "JPY" => Ok(Currency::Jpy),
            other => Err(LedgerError::InvalidCurrency(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
