use std::future::Future;

use thiserror::Error;

use crate::{db_types::CandidateProfile, errors::ErrorKind};

#[derive(Debug, Clone, Error)]
pub enum CandidatePoolError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CandidatePoolError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

impl From<sqlx::Error> for CandidatePoolError {
    fn from(e: sqlx::Error) -> Self {
        CandidatePoolError::DatabaseError(e.to_string())
    }
}

/// Read access to the job seekers that rankings are drawn from.
///
/// The user store owns these records. Backends keep a projection of the fields the ranking needs.
pub trait CandidatePool: Clone + Send + Sync {
    /// All users holding the job seeker role, in a stable order.
    fn fetch_seekers(&self) -> impl Future<Output = Result<Vec<CandidateProfile>, CandidatePoolError>> + Send;

    /// Inserts or replaces the projection of a job seeker.
    fn upsert_seeker(&self, profile: CandidateProfile) -> impl Future<Output = Result<(), CandidatePoolError>> + Send;
}
