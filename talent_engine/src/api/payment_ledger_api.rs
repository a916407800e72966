use std::{fmt::Debug, time::Duration};

use log::*;
use talent_common::helpers::normalize_address;

use crate::{
    chain::{ChainReader, ChainReaderError},
    db_types::{ConsumingAction, NewPayment, Payer, Payment, PaymentId, PaymentPurpose, TxRef, UserId, Wei},
    events::{EventProducers, PaymentConsumedEvent, PaymentVerifiedEvent},
    traits::{PaymentLedgerError, PaymentManagement, PaymentQueryFilter},
};

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(20);

/// `PaymentLedgerApi` turns on-chain transfers into one-time spendable payments.
///
/// Amounts and recipients are only ever taken from the chain. A payment is spent through [`Self::consume`] (or the
/// combined premium flows), and the backend guarantees that at most one of any number of concurrent attempts
/// succeeds.
pub struct PaymentLedgerApi<B, C> {
    db: B,
    chain: C,
    network: String,
    producers: EventProducers,
    rpc_timeout: Duration,
}

impl<B, C> Debug for PaymentLedgerApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentLedgerApi ({})", self.network)
    }
}

impl<B, C> PaymentLedgerApi<B, C> {
    pub fn new<S: Into<String>>(db: B, chain: C, network: S, producers: EventProducers) -> Self {
        Self { db, chain, network: network.into(), producers, rpc_timeout: DEFAULT_RPC_TIMEOUT }
    }

    /// Bounds each verification, covering both RPC calls. A verification that runs over fails with
    /// [`ChainReaderError::Timeout`].
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn network(&self) -> &str {
        self.network.as_str()
    }
}

impl<B, C> PaymentLedgerApi<B, C>
where
    B: PaymentManagement,
    C: ChainReader,
{
    /// Verifies a job posting fee on chain and records it as a verified, unconsumed payment.
    ///
    /// The transfer must be confirmed, sent to `expected_recipient` (compared case-insensitively) and worth at least
    /// `min_amount`. Anything else fails without storing a record.
    pub async fn verify_and_store(
        &self,
        rpc_endpoint: &str,
        expected_recipient: &str,
        tx_ref: &str,
        min_amount: Wei,
    ) -> Result<Payment, PaymentLedgerError> {
        self.verify_and_store_for(rpc_endpoint, expected_recipient, tx_ref, min_amount, PaymentPurpose::JobPosting)
            .await
    }

    /// As [`Self::verify_and_store`], for a payment made for `purpose`.
    pub async fn verify_and_store_for(
        &self,
        rpc_endpoint: &str,
        expected_recipient: &str,
        tx_ref: &str,
        min_amount: Wei,
        purpose: PaymentPurpose,
    ) -> Result<Payment, PaymentLedgerError> {
        let tx_ref = tx_ref.parse::<TxRef>().map_err(|e| PaymentLedgerError::InvalidTxRef(e.to_string()))?;
        if self.db.fetch_payment_by_tx_ref(&tx_ref, &self.network).await?.is_some() {
            debug!("💳 Transaction {tx_ref} has already been recorded");
            return Err(PaymentLedgerError::PaymentAlreadyExists(tx_ref));
        }
        trace!("💳 Verifying transaction {tx_ref} on {}", self.network);
        let transfer = tokio::time::timeout(self.rpc_timeout, self.chain.fetch_transfer(rpc_endpoint, &tx_ref))
            .await
            .map_err(|_| ChainReaderError::Timeout)??;

        let expected = normalize_address(expected_recipient);
        let actual = transfer.recipient.as_deref().map(normalize_address).unwrap_or_default();
        if expected.is_empty() || actual != expected {
            warn!("💳 Transaction {tx_ref} paid {actual}, not the platform wallet {expected}");
            return Err(PaymentLedgerError::RecipientMismatch { expected, actual });
        }
        if transfer.amount < min_amount {
            warn!("💳 Transaction {tx_ref} transferred {}, which is below the fee of {min_amount}", transfer.amount);
            return Err(PaymentLedgerError::InsufficientAmount { required: min_amount, actual: transfer.amount });
        }
        if !transfer.confirmed {
            info!("💳 Transaction {tx_ref} has not been confirmed successfully");
            return Err(PaymentLedgerError::TransactionNotConfirmed(tx_ref));
        }

        let new_payment =
            NewPayment { tx_ref, amount: transfer.amount, recipient: actual, network: self.network.clone(), purpose };
        let payment = self.db.insert_verified_payment(new_payment).await?;
        info!("💳 Payment #{} verified: {} for {}", payment.id, payment.amount, payment.purpose);
        self.call_payment_verified_hook(&payment).await;
        Ok(payment)
    }

    /// Verifies a premium upgrade fee and spends it on `seeker` in one step. Premium takes effect as soon as this
    /// returns, through the payment consumed hook.
    pub async fn upgrade_to_premium(
        &self,
        rpc_endpoint: &str,
        expected_recipient: &str,
        tx_ref: &str,
        min_amount: Wei,
        seeker: &UserId,
    ) -> Result<Payment, PaymentLedgerError> {
        let payment = self
            .verify_and_store_for(
                rpc_endpoint,
                expected_recipient,
                tx_ref,
                min_amount,
                PaymentPurpose::JobSeekerPremium,
            )
            .await?;
        self.attach_payer(payment.id, Payer::job_seeker(seeker.clone())).await
    }

    /// Attaches the payer to the payment. Attaching the same payer twice is harmless; attaching a different one
    /// fails with [`PaymentLedgerError::PaymentAlreadyAttached`].
    ///
    /// The payer's role must fit the payment's purpose. A premium payment is consumed in the same step, since premium
    /// is granted immediately.
    pub async fn attach_payer(&self, id: PaymentId, payer: Payer) -> Result<Payment, PaymentLedgerError> {
        let payment = self.db.fetch_payment(id).await?.ok_or(PaymentLedgerError::PaymentNotFound(id))?;
        let permitted = payment.purpose.payer_role();
        if payer.role != permitted {
            warn!("💳 {payer} cannot claim payment #{id}, which is for {}", payment.purpose);
            return Err(PaymentLedgerError::RoleNotPermitted { purpose: payment.purpose, role: payer.role });
        }
        match payment.purpose {
            PaymentPurpose::JobPosting => {
                let payment = self.db.attach_payer(id, &payer).await?;
                debug!("💳 Payment #{id} attached to {payer}");
                Ok(payment)
            },
            PaymentPurpose::JobSeekerPremium => {
                let action = ConsumingAction::PremiumUpgrade(payer.id.clone());
                let payment = self.db.attach_and_consume(id, &payer, &action).await?;
                info!("💳 Payment #{id} spent on {action}");
                self.call_payment_consumed_hook(&payment, action).await;
                Ok(payment)
            },
        }
    }

    /// Spends the payment on `action`. This is the gate every priced action passes before it takes effect.
    ///
    /// Fails with [`PaymentLedgerError::AlreadyConsumed`] if the payment has been spent, and with a `Forbidden` kind
    /// of error if `consumer` is not the attached payer.
    pub async fn consume(
        &self,
        id: PaymentId,
        consumer: &UserId,
        action: ConsumingAction,
    ) -> Result<Payment, PaymentLedgerError> {
        let payment = self.db.consume_payment(id, consumer, &action).await.map_err(|e| {
            debug!("💳 {consumer} could not spend payment #{id} on {action}. {e}");
            e
        })?;
        info!("💳 Payment #{id} spent on {action}");
        self.call_payment_consumed_hook(&payment, action).await;
        Ok(payment)
    }

    pub async fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, PaymentLedgerError> {
        self.db.fetch_payment(id).await
    }

    /// Payments matching the filter, oldest first.
    pub async fn list(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, PaymentLedgerError> {
        self.db.search_payments(filter).await
    }

    async fn call_payment_verified_hook(&self, payment: &Payment) {
        for emitter in &self.producers.payment_verified_producer {
            debug!("💳 Notifying payment verified hook subscribers");
            emitter.publish_event(PaymentVerifiedEvent::new(payment.clone())).await;
        }
    }

    async fn call_payment_consumed_hook(&self, payment: &Payment, action: ConsumingAction) {
        for emitter in &self.producers.payment_consumed_producer {
            debug!("💳 Notifying payment consumed hook subscribers");
            emitter.publish_event(PaymentConsumedEvent::new(payment.clone(), action.clone())).await;
        }
    }
}
