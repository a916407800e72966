//! Deterministic stand-ins for the chain and the scoring capability.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;

use crate::{
    chain::{ChainReader, ChainReaderError, ChainTransfer},
    db_types::{NewPayment, Payment, PaymentPurpose, TxRef, Wei},
    scoring::{ScoreRequest, ScoringClient, ScoringError},
    traits::PaymentManagement,
};

pub const TEST_ADMIN_WALLET: &str = "0x00000000000000000000000000000000000a11ce";

/// A syntactically valid transaction hash derived from `n`.
pub fn tx_ref(n: u64) -> TxRef {
    format!("0x{n:064x}").parse().expect("valid tx hash")
}

/// Stores a verified payment of 0.1 for `purpose` directly, bypassing the chain.
pub async fn seed_verified_payment<B: PaymentManagement>(db: &B, n: u64, purpose: PaymentPurpose) -> Payment {
    let payment = NewPayment {
        tx_ref: tx_ref(n),
        amount: Wei::from_ether_str("0.1").expect("valid amount"),
        recipient: TEST_ADMIN_WALLET.to_string(),
        network: "testnet".to_string(),
        purpose,
    };
    db.insert_verified_payment(payment).await.expect("Error seeding payment")
}

/// Serves transfers from a fixed table. Unknown hashes are reported as not found. Clones share the table.
#[derive(Debug, Clone, Default)]
pub struct StaticChainReader {
    transfers: Arc<Mutex<HashMap<TxRef, Result<ChainTransfer, ChainReaderError>>>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StaticChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A confirmed transfer of `ether` to `recipient`.
    pub fn with_transfer(self, tx: &TxRef, recipient: &str, ether: &str) -> Self {
        let transfer = ChainTransfer {
            tx_ref: tx.clone(),
            recipient: Some(recipient.to_string()),
            amount: Wei::from_ether_str(ether).expect("valid amount"),
            confirmed: true,
        };
        self.with_result(tx, Ok(transfer))
    }

    pub fn with_result(self, tx: &TxRef, result: Result<ChainTransfer, ChainReaderError>) -> Self {
        self.transfers.lock().insert(tx.clone(), result);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChainReader for StaticChainReader {
    async fn fetch_transfer(&self, _rpc_endpoint: &str, tx_ref: &TxRef) -> Result<ChainTransfer, ChainReaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.transfers.lock().get(tx_ref).cloned();
        result.unwrap_or_else(|| Err(ChainReaderError::TransactionNotFound(tx_ref.clone())))
    }
}

/// Scores candidates by their scoring text. Unscripted candidates fail as unavailable.
#[derive(Debug, Clone, Default)]
pub struct ScriptedScorer {
    scores: Arc<Mutex<HashMap<String, Result<f64, ScoringError>>>>,
    skills: Arc<Mutex<HashMap<String, Vec<String>>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(self, candidate_text: &str, score: f64) -> Self {
        self.scores.lock().insert(candidate_text.to_string(), Ok(score));
        self
    }

    pub fn with_failure(self, candidate_text: &str, error: ScoringError) -> Self {
        self.scores.lock().insert(candidate_text.to_string(), Err(error));
        self
    }

    /// Holds the score for `candidate_text` back for `delay` before answering.
    pub fn with_delay(self, candidate_text: &str, delay: Duration) -> Self {
        self.delays.lock().insert(candidate_text.to_string(), delay);
        self
    }

    pub fn with_skills(self, text: &str, skills: &[&str]) -> Self {
        self.skills.lock().insert(text.to_string(), skills.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Total number of scoring calls made.
    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of scoring calls made for `candidate_text`.
    pub fn calls_for(&self, candidate_text: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == candidate_text).count()
    }
}

impl ScoringClient for ScriptedScorer {
    async fn score(&self, request: ScoreRequest<'_>) -> Result<f64, ScoringError> {
        let text = request.candidate_text.to_string();
        self.calls.lock().push(text.clone());
        let delay = self.delays.lock().get(&text).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.scores.lock().get(&text).cloned();
        result.unwrap_or_else(|| Err(ScoringError::Unavailable(format!("no score scripted for '{text}'"))))
    }

    async fn extract_skills(&self, text: &str) -> Result<Vec<String>, ScoringError> {
        Ok(self.skills.lock().get(text).cloned().unwrap_or_default())
    }
}
