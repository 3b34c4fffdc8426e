//! Income and expense records owned by a single wallet.
//!
//! Both kinds carry the same fields; they differ in how they move the owning
//! wallet's balance and in which table they live.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Money;

/// Money entering a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: Uuid,
    /// Owning wallet. Never changes once the record exists.
    pub wallet_id: Uuid,
    pub subcategory_id: Uuid,
    pub amount: Money,
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl IncomeRecord {
    pub fn new(
        wallet_id: Uuid,
        subcategory_id: Uuid,
        amount: Money,
        description: String,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            subcategory_id,
            amount,
            description,
            date,
            created_at: Utc::now(),
        }
    }
}

/// Money leaving a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: Uuid,
    /// Owning wallet. Never changes once the record exists.
    pub wallet_id: Uuid,
    pub subcategory_id: Uuid,
    pub amount: Money,
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ExpenseRecord {
    pub fn new(
        wallet_id: Uuid,
        subcategory_id: Uuid,
        amount: Money,
        description: String,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            subcategory_id,
            amount,
            description,
            date,
            created_at: Utc::now(),
        }
    }
}
