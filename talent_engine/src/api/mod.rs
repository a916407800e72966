//! # Talent engine public API
//!
//! The `api` module exposes the programmatic API of the engine. Each API takes a storage backend that implements the
//! traits it needs, so callers can pick [`crate::SqliteDatabase`] or [`crate::MemoryDatabase`] without code changes.
//!
//! * [`PaymentLedgerApi`] verifies transfers on chain and guards their one-time consumption.
//! * [`JobPostingApi`] creates jobs against a payment and records applications.
//! * [`MatchScoreCache`] reads and merges the per-job score cache.
//! * [`RankingApi`] ranks job seekers against a job, filling cache gaps through the scoring client.
//!
//! ```rust,ignore
//! use talent_engine::{events::EventProducers, JsonRpcChainReader, PaymentLedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let ledger = PaymentLedgerApi::new(db, JsonRpcChainReader::new(timeout)?, "sepolia", EventProducers::default());
//! let payment = ledger.verify_and_store(rpc_url, admin_wallet, tx_hash, fee).await?;
//! ```
pub mod errors;
mod job_posting_api;
mod match_score_cache;
mod payment_ledger_api;
mod ranking_api;
pub mod ranking_objects;

pub use job_posting_api::JobPostingApi;
pub use match_score_cache::MatchScoreCache;
pub use payment_ledger_api::PaymentLedgerApi;
pub use ranking_api::{RankingApi, RankingOptions, DEFAULT_SKILL_LIMIT};
