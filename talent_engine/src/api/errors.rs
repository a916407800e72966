use thiserror::Error;

use crate::{
    db_types::{JobId, UserId},
    errors::ErrorKind,
    traits::{CandidatePoolError, JobManagementError},
};

/// Failures that abort a ranking. Per-candidate scoring failures are never reported here.
#[derive(Debug, Clone, Error)]
pub enum RankingError {
    #[error("Job #{0} does not exist")]
    JobNotFound(JobId),
    #[error("Job #{job} does not belong to {user}")]
    NotJobOwner { job: JobId, user: UserId },
    #[error("Could not read the job. {0}")]
    JobStore(#[from] JobManagementError),
    #[error("Could not read the candidate pool. {0}")]
    CandidatePool(#[from] CandidatePoolError),
}

impl RankingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RankingError::JobNotFound(_) => ErrorKind::NotFound,
            RankingError::NotJobOwner { .. } => ErrorKind::Forbidden,
            RankingError::JobStore(e) => e.kind(),
            RankingError::CandidatePool(e) => e.kind(),
        }
    }
}
