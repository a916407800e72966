use serde::{Deserialize, Serialize};

use crate::db_types::{ConsumingAction, Payment};

/// A payment passed on-chain verification and was recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerifiedEvent {
    pub payment: Payment,
}

impl PaymentVerifiedEvent {
    pub fn new(payment: Payment) -> Self {
        Self { payment }
    }
}

/// A payment was spent. For [`ConsumingAction::PremiumUpgrade`] the subscriber is expected to grant premium status
/// to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConsumedEvent {
    pub payment: Payment,
    pub action: ConsumingAction,
}

impl PaymentConsumedEvent {
    pub fn new(payment: Payment, action: ConsumingAction) -> Self {
        Self { payment, action }
    }
}
