use serde::{Deserialize, Serialize};

use crate::db_types::{Payment, PaymentPurpose, PaymentStatus, UserId};

/// Filter for [`crate::traits::PaymentManagement::search_payments`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentQueryFilter {
    pub payer: Option<UserId>,
    pub status: Option<PaymentStatus>,
    pub purpose: Option<PaymentPurpose>,
    pub consumed: Option<bool>,
}

impl PaymentQueryFilter {
    pub fn with_payer<S: Into<UserId>>(mut self, payer: S) -> Self {
        self.payer = Some(payer.into());
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_purpose(mut self, purpose: PaymentPurpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn with_consumed(mut self, consumed: bool) -> Self {
        self.consumed = Some(consumed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payer.is_none() && self.status.is_none() && self.purpose.is_none() && self.consumed.is_none()
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.payer.as_ref().map(|p| payment.is_owned_by(p)).unwrap_or(true) &&
            self.status.map(|s| s == payment.status).unwrap_or(true) &&
            self.purpose.map(|p| p == payment.purpose).unwrap_or(true) &&
            self.consumed.map(|c| c == payment.consumed).unwrap_or(true)
    }
}
