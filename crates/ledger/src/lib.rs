//! Persistence for wallet aggregates.
//!
//! A [`Wallet`] owns its [`IncomeRecord`]s, [`ExpenseRecord`]s and the
//! [`Transfer`]s it takes part in. [`Ledger`] saves and loads the whole cluster
//! through a [`WalletStore`], one database transaction per save, and tells
//! callers whether a loaded wallet is complete via [`Materialization`].
//!
//! ```no_run
//! # async fn demo(db: sea_orm::DatabaseConnection) -> ledger::LedgerResult<()> {
//! use ledger::{Currency, Ledger, Money, Wallet, WalletRepository, WalletType};
//!
//! let ledger = Ledger::builder().database(db).build().await?;
//! let mut wallet = Wallet::new(
//!     "alice".to_string(),
//!     "Cash".to_string(),
//!     WalletType::Cash,
//!     Money::new(10_000, Currency::Usd),
//! );
//! ledger.save(&mut wallet).await?;
//!
//! let header = ledger.find_by_id(wallet.id).await?;
//! assert!(header.is_some_and(|w| !w.is_fully_loaded()));
//! # Ok(())
//! # }
//! ```

pub use currency::Currency;
pub use entries::{ExpenseRecord, IncomeRecord};
pub use error::{LedgerError, TxPhase};
pub use mapper::WalletRecord;
pub use money::Money;
pub use repository::{Ledger, LedgerBuilder, WalletRepository};
pub use store::{ReconcilePolicies, ReconcilePolicy, SqlWalletStore, WalletStore};
pub use transfer::{Transfer, TransferSide};
pub use wallet::{Materialization, Wallet, WalletType};

mod currency;
mod entries;
mod error;
pub mod mapper;
mod money;
mod repository;
pub mod schema;
mod store;
mod transfer;
mod util;
mod wallet;

pub type LedgerResult<T> = Result<T, LedgerError>;
