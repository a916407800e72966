//! # Storage contracts
//!
//! This module defines the behaviour a storage backend must provide for the engine. Two backends implement all of
//! them: [`crate::SqliteDatabase`] for production, and [`crate::MemoryDatabase`] for tests and single-process use.
//!
//! * [`PaymentManagement`] stores payments and enforces one-time consumption.
//! * [`JobManagement`] stores jobs, applications and the per-job match score cache.
//! * [`CandidatePool`] lists the job seekers a ranking is drawn from.
//!
//! Methods return `impl Future + Send` so that generic callers, such as the score write-back worker, can run them on
//! spawned tasks.
mod candidate_pool;
mod data_objects;
mod job_management;
mod payment_management;

pub use candidate_pool::{CandidatePool, CandidatePoolError};
pub use data_objects::PaymentQueryFilter;
pub use job_management::{check_scores, JobManagement, JobManagementError};
pub use payment_management::{
    attach_and_consume_rejection,
    consume_rejection,
    PaymentLedgerError,
    PaymentManagement,
};
