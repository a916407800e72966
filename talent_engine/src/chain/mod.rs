//! Read-only access to on-chain transfers.
//!
//! [`ChainReader`] is the only source of truth the payment ledger accepts for amounts, recipients and confirmation.
//! [`JsonRpcChainReader`] implements it against an Ethereum-style JSON-RPC 2.0 endpoint.
mod json_rpc;

use std::future::Future;

pub use json_rpc::JsonRpcChainReader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{TxRef, Wei},
    errors::ErrorKind,
};

#[derive(Debug, Clone, Error)]
pub enum ChainReaderError {
    #[error("The RPC endpoint is unavailable: {0}")]
    RpcUnavailable(String),
    #[error("The RPC call timed out")]
    Timeout,
    #[error("Transaction {0} was not found on chain")]
    TransactionNotFound(TxRef),
    #[error("The RPC endpoint returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("The RPC endpoint returned error {code}: {message}")]
    RpcError { code: i64, message: String },
}

impl ChainReaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainReaderError::RpcUnavailable(_) | ChainReaderError::Timeout | ChainReaderError::RpcError { .. } => {
                ErrorKind::UpstreamUnavailable
            },
            ChainReaderError::TransactionNotFound(_) => ErrorKind::NotFound,
            ChainReaderError::MalformedResponse(_) => ErrorKind::DataIntegrity,
        }
    }
}

/// What the chain says about a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransfer {
    pub tx_ref: TxRef,
    /// `None` for contract creations, which never pay the platform.
    pub recipient: Option<String>,
    pub amount: Wei,
    /// True iff the receipt exists and reports success.
    pub confirmed: bool,
}

pub trait ChainReader: Clone + Send + Sync {
    /// Reads the transaction body and its receipt. Makes exactly two RPC calls.
    fn fetch_transfer(
        &self,
        rpc_endpoint: &str,
        tx_ref: &TxRef,
    ) -> impl Future<Output = Result<ChainTransfer, ChainReaderError>> + Send;
}
