//! Talent Engine
//!
//! The talent engine is the core of a recruiting marketplace. It guards the two places where money and data
//! correctness meet:
//!
//! 1. The payment ledger ([`PaymentLedgerApi`]). On-chain transfers are verified through a [`chain::ChainReader`] and
//!    recorded as payments, which can each be spent exactly once on a priced action such as posting a job
//!    ([`JobPostingApi`]) or a premium upgrade.
//! 2. Candidate ranking ([`RankingApi`]). Job seekers are ranked against a job by a fitment score from an external
//!    [`scoring::ScoringClient`]. Scores are cached per job ([`MatchScoreCache`]) and new ones are written back
//!    asynchronously by the [`write_back`] worker.
//!
//! Storage is behind the traits in [`mod@traits`]. [`SqliteDatabase`] is the production backend and
//! [`MemoryDatabase`] keeps everything in process, for tests and single-process deployments.
//!
//! The engine also provides a set of events that can be subscribed to ([`events`]). For example, when a premium
//! payment is consumed, a `PaymentConsumedEvent` is emitted so that the user store can grant premium status.
pub mod api;
pub mod chain;
pub mod config;
pub mod db_types;
pub mod errors;
pub mod events;
pub mod helpers;
pub mod memory;
pub mod scoring;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
pub mod write_back;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    errors::RankingError,
    ranking_objects::{MatchSupply, RankedCandidate, Ranking, SkillFrequency},
    JobPostingApi,
    MatchScoreCache,
    PaymentLedgerApi,
    RankingApi,
    RankingOptions,
    DEFAULT_SKILL_LIMIT,
};
pub use chain::{ChainReader, JsonRpcChainReader};
pub use config::EngineConfig;
pub use errors::ErrorKind;
pub use memory::MemoryDatabase;
pub use scoring::{HttpScoringClient, ScoringClient};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use write_back::{start_write_back_worker, WriteBackQueue};
