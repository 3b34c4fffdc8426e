//! The module contains the errors the ledger can throw.
//!
//! Errors fall in four groups:
//!
//! - transaction errors ([`Transaction`]) when a database transaction cannot be
//!   opened, committed or rolled back;
//! - statement errors ([`Statement`]) when a single row cannot be written,
//!   carrying the offending entity ID;
//! - mapping errors ([`Mapping`]) when a persisted row no longer satisfies a
//!   domain invariant on load;
//! - domain errors raised by the aggregate itself.
//!
//! A missing wallet is *not* an error: lookups return `Ok(None)`.
//!
//!  [`Transaction`]: LedgerError::Transaction
//!  [`Statement`]: LedgerError::Statement
//!  [`Mapping`]: LedgerError::Mapping
use core::fmt;

use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Phase of a database transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxPhase {
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxPhase::Begin => "begin",
            TxPhase::Commit => "commit",
            TxPhase::Rollback => "roll back",
        })
    }
}

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("failed to {phase} transaction: {source}")]
    Transaction {
        phase: TxPhase,
        #[source]
        source: DbErr,
    },
    #[error("failed to {action} {entity} {id}: {source}")]
    Statement {
        action: &'static str,
        entity: &'static str,
        id: String,
        #[source]
        source: DbErr,
    },
    #[error("failed to load wallet {wallet_id}: {source}")]
    Mapping {
        wallet_id: String,
        #[source]
        source: Box<LedgerError>,
    },
    #[error("wallet {wallet_id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        wallet_id: String,
        expected: i64,
        found: i64,
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("\"{0}\" already present!")]
    DuplicateEntry(Uuid),
    #[error("\"{0}\" entry not found!")]
    EntryNotFound(Uuid),
    #[error("wallet {0} is not fully loaded")]
    NotFullyLoaded(Uuid),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl LedgerError {
    pub(crate) fn statement(
        action: &'static str,
        entity: &'static str,
        id: impl fmt::Display,
    ) -> impl FnOnce(DbErr) -> LedgerError {
        move |source| LedgerError::Statement {
            action,
            entity,
            id: id.to_string(),
            source,
        }
    }

    pub(crate) fn transaction(phase: TxPhase) -> impl FnOnce(DbErr) -> LedgerError {
        move |source| LedgerError::Transaction { phase, source }
    }

    pub(crate) fn mapping(
        wallet_id: impl fmt::Display,
    ) -> impl FnOnce(LedgerError) -> LedgerError {
        move |source| LedgerError::Mapping {
            wallet_id: wallet_id.to_string(),
            source: Box::new(source),
        }
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Transaction { phase: a, source: x },
                Self::Transaction { phase: b, source: y },
            ) => a == b && x.to_string() == y.to_string(),
            (
                Self::Statement {
                    action: a1,
                    entity: e1,
                    id: i1,
                    source: s1,
                },
                Self::Statement {
                    action: a2,
                    entity: e2,
                    id: i2,
                    source: s2,
                },
            ) => a1 == a2 && e1 == e2 && i1 == i2 && s1.to_string() == s2.to_string(),
            (
                Self::Mapping {
                    wallet_id: a,
                    source: x,
                },
                Self::Mapping {
                    wallet_id: b,
                    source: y,
                },
            ) => a == b && x == y,
            (
                Self::Conflict {
                    wallet_id: a,
                    expected: e1,
                    found: f1,
                },
                Self::Conflict {
                    wallet_id: b,
                    expected: e2,
                    found: f2,
                },
            ) => a == b && e1 == e2 && f1 == f2,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::InvalidRecord(a), Self::InvalidRecord(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::DuplicateEntry(a), Self::DuplicateEntry(b)) => a == b,
            (Self::EntryNotFound(a), Self::EntryNotFound(b)) => a == b,
            (Self::NotFullyLoaded(a), Self::NotFullyLoaded(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_error_names_entity_and_id() {
        let id = Uuid::nil();
        let err = LedgerError::statement("save", "expense record", id)(DbErr::Custom(
            "UNIQUE constraint failed".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            format!(
                "failed to save expense record {id}: Custom Error: UNIQUE constraint failed"
            )
        );
    }

    #[test]
    fn mapping_error_keeps_cause_chain() {
        let cause = LedgerError::InvalidAmount("amount must be > 0".into());
        let err = LedgerError::mapping("w-1")(cause);
        assert_eq!(
            err.to_string(),
            "failed to load wallet w-1: Invalid amount: amount must be > 0"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Invalid amount: amount must be > 0"));
    }
}
