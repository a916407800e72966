use std::future::Future;

use thiserror::Error;

use crate::{
    chain::ChainReaderError,
    db_types::{
        ConsumingAction,
        NewPayment,
        Payer,
        PayerRole,
        Payment,
        PaymentId,
        PaymentPurpose,
        PaymentStatus,
        TxRef,
        UserId,
        Wei,
    },
    errors::ErrorKind,
    traits::data_objects::PaymentQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentLedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Stored payment could not be decoded: {0}")]
    CorruptRecord(String),
    #[error("Invalid transaction reference: {0}")]
    InvalidTxRef(String),
    #[error("Payment #{0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Transaction {0} has already been recorded as a payment")]
    PaymentAlreadyExists(TxRef),
    #[error("Payment #{0} is already attached to a different payer")]
    PaymentAlreadyAttached(PaymentId),
    #[error("Payment #{0} has already been consumed")]
    AlreadyConsumed(PaymentId),
    #[error("Payment #{0} has no payer attached")]
    PayerNotAttached(PaymentId),
    #[error("Payment #{payment} does not belong to {user}")]
    NotPaymentOwner { payment: PaymentId, user: UserId },
    #[error("Payment #{0} has not been verified")]
    PaymentNotVerified(PaymentId),
    #[error("A {role} cannot claim a {purpose} payment")]
    RoleNotPermitted { purpose: PaymentPurpose, role: PayerRole },
    #[error("Payment #{payment} was made for {actual}, not {expected}")]
    WrongPurpose { payment: PaymentId, expected: PaymentPurpose, actual: PaymentPurpose },
    #[error("Transfer was sent to {actual}, not the platform wallet {expected}")]
    RecipientMismatch { expected: String, actual: String },
    #[error("Transfer of {actual} is below the required {required}")]
    InsufficientAmount { required: Wei, actual: Wei },
    #[error("Transaction {0} has not been confirmed successfully")]
    TransactionNotConfirmed(TxRef),
    #[error("Could not verify the transaction on chain. {0}")]
    ChainError(#[from] ChainReaderError),
}

impl PaymentLedgerError {
    pub fn kind(&self) -> ErrorKind {
        use PaymentLedgerError::*;
        match self {
            DatabaseError(_) => ErrorKind::Internal,
            CorruptRecord(_) => ErrorKind::DataIntegrity,
            InvalidTxRef(_) | PaymentNotVerified(_) | WrongPurpose { .. } => ErrorKind::Validation,
            RecipientMismatch { .. } | InsufficientAmount { .. } | TransactionNotConfirmed(_) => ErrorKind::Validation,
            PaymentNotFound(_) => ErrorKind::NotFound,
            PaymentAlreadyExists(_) | PaymentAlreadyAttached(_) | AlreadyConsumed(_) => ErrorKind::Conflict,
            PayerNotAttached(_) | NotPaymentOwner { .. } | RoleNotPermitted { .. } => ErrorKind::Forbidden,
            ChainError(e) => e.kind(),
        }
    }
}

impl From<sqlx::Error> for PaymentLedgerError {
    fn from(e: sqlx::Error) -> Self {
        PaymentLedgerError::DatabaseError(e.to_string())
    }
}

/// Explains why a conditional consumption matched no row, given the payment as it is now.
///
/// Backends perform consumption as a single check-and-set. When it is rejected, they re-read the payment and call
/// this to produce the error, so every backend reports rejections identically.
pub fn consume_rejection(
    id: PaymentId,
    current: Option<&Payment>,
    consumer: &UserId,
    action: &ConsumingAction,
) -> PaymentLedgerError {
    match current {
        None => PaymentLedgerError::PaymentNotFound(id),
        Some(p) if p.consumed => PaymentLedgerError::AlreadyConsumed(id),
        Some(p) if p.purpose != action.purpose() => {
            PaymentLedgerError::WrongPurpose { payment: id, expected: action.purpose(), actual: p.purpose }
        },
        Some(p) if p.status != PaymentStatus::Verified => PaymentLedgerError::PaymentNotVerified(id),
        Some(p) => match &p.payer {
            None => PaymentLedgerError::PayerNotAttached(id),
            Some(payer) if &payer.id != consumer => {
                PaymentLedgerError::NotPaymentOwner { payment: id, user: consumer.clone() }
            },
            // The row matched every condition when re-read, so another writer changed it between the two statements.
            Some(_) => PaymentLedgerError::AlreadyConsumed(id),
        },
    }
}

/// As [`consume_rejection`], for the combined attach-and-consume step, where a payment held by someone else is a
/// conflict rather than an ownership violation.
pub fn attach_and_consume_rejection(
    id: PaymentId,
    current: Option<&Payment>,
    payer: &Payer,
    action: &ConsumingAction,
) -> PaymentLedgerError {
    match current {
        Some(p) if !p.consumed && p.purpose != action.purpose() => {
            PaymentLedgerError::WrongPurpose { payment: id, expected: action.purpose(), actual: p.purpose }
        },
        Some(p) if !p.consumed && p.payer.as_ref().map(|c| c.id != payer.id).unwrap_or(false) => {
            PaymentLedgerError::PaymentAlreadyAttached(id)
        },
        Some(p) if !p.consumed && p.status == PaymentStatus::Verified => PaymentLedgerError::AlreadyConsumed(id),
        _ => consume_rejection(id, current, &payer.id, action),
    }
}

/// Storage behaviour for the payment ledger.
///
/// Every mutating method is a single atomic step in the backend. In particular, consumption is one conditional
/// update, which is what makes concurrent attempts to spend the same payment resolve to exactly one winner.
pub trait PaymentManagement: Clone + Send + Sync {
    /// Stores a payment that has passed on-chain verification. The payment is stored as `Verified` and unconsumed.
    ///
    /// Fails with [`PaymentLedgerError::PaymentAlreadyExists`] if the transaction has already been recorded on the
    /// same network.
    fn insert_verified_payment(
        &self,
        payment: NewPayment,
    ) -> impl Future<Output = Result<Payment, PaymentLedgerError>> + Send;

    fn fetch_payment(&self, id: PaymentId) -> impl Future<Output = Result<Option<Payment>, PaymentLedgerError>> + Send;

    fn fetch_payment_by_tx_ref(
        &self,
        tx_ref: &TxRef,
        network: &str,
    ) -> impl Future<Output = Result<Option<Payment>, PaymentLedgerError>> + Send;

    /// Sets the payer of the payment, if it has none. Attaching the same payer again is a no-op that returns the
    /// payment. Attaching a different payer fails with [`PaymentLedgerError::PaymentAlreadyAttached`].
    fn attach_payer(
        &self,
        id: PaymentId,
        payer: &Payer,
    ) -> impl Future<Output = Result<Payment, PaymentLedgerError>> + Send;

    /// Marks the payment as consumed by `action`, provided it is verified, unconsumed, attached to `consumer`
    /// and was made for the purpose that `action` needs.
    ///
    /// Rejections are reported as described in [`consume_rejection`].
    fn consume_payment(
        &self,
        id: PaymentId,
        consumer: &UserId,
        action: &ConsumingAction,
    ) -> impl Future<Output = Result<Payment, PaymentLedgerError>> + Send;

    /// Attaches `payer` and consumes the payment in one step. Used for purchases that take effect immediately, such
    /// as a premium upgrade.
    fn attach_and_consume(
        &self,
        id: PaymentId,
        payer: &Payer,
        action: &ConsumingAction,
    ) -> impl Future<Output = Result<Payment, PaymentLedgerError>> + Send;

    /// Returns the payments matching the filter, oldest first.
    fn search_payments(
        &self,
        filter: PaymentQueryFilter,
    ) -> impl Future<Output = Result<Vec<Payment>, PaymentLedgerError>> + Send;
}
