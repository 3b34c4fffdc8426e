//! Transfers move money between two wallets.
//!
//! A transfer is visible from both endpoints: it belongs to the source
//! wallet's aggregate and to the destination wallet's aggregate.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Money;

/// Which side of a transfer a wallet is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferSide {
    Outgoing,
    Incoming,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount: Money,
    /// Charged to the source wallet on top of `amount`. Same currency as `amount`.
    pub fee: Money,
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn new(
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Money,
        fee: Money,
        description: String,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_wallet_id,
            to_wallet_id,
            amount,
            fee,
            description,
            date,
            created_at: Utc::now(),
        }
    }

    /// Returns the side `wallet_id` is on, or `None` when the transfer does not
    /// touch that wallet.
    #[must_use]
    pub fn side_of(&self, wallet_id: Uuid) -> Option<TransferSide> {
        if self.from_wallet_id == wallet_id {
            Some(TransferSide::Outgoing)
        } else if self.to_wallet_id == wallet_id {
            Some(TransferSide::Incoming)
        } else {
            None
        }
    }
}
