//! Table definitions for the wallet aggregate.
//!
//! Each `Model` is the flat persistence record of one row; see
//! [`mapper`](crate::mapper) for the conversions to and from the domain.

pub mod expense_records;
pub mod income_records;
pub mod transfers;
pub mod wallets;
