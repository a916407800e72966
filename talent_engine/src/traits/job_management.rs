use std::{collections::HashMap, future::Future};

use thiserror::Error;

use crate::{
    db_types::{Job, JobId, NewJob, Payment, PaymentId, UserId},
    errors::ErrorKind,
    traits::PaymentLedgerError,
};

#[derive(Debug, Clone, Error)]
pub enum JobManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Stored job could not be decoded: {0}")]
    CorruptRecord(String),
    #[error("Job #{0} does not exist")]
    JobNotFound(JobId),
    #[error("Job #{job} does not belong to {user}")]
    NotJobOwner { job: JobId, user: UserId },
    #[error("A job needs a title")]
    MissingTitle,
    #[error("Score {score} for {candidate} is outside 0 to 100")]
    InvalidScore { candidate: UserId, score: f64 },
    #[error("The job payment was rejected. {0}")]
    PaymentRejected(#[from] PaymentLedgerError),
}

impl JobManagementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobManagementError::DatabaseError(_) => ErrorKind::Internal,
            JobManagementError::CorruptRecord(_) => ErrorKind::DataIntegrity,
            JobManagementError::JobNotFound(_) => ErrorKind::NotFound,
            JobManagementError::NotJobOwner { .. } => ErrorKind::Forbidden,
            JobManagementError::MissingTitle | JobManagementError::InvalidScore { .. } => ErrorKind::Validation,
            JobManagementError::PaymentRejected(e) => e.kind(),
        }
    }
}

impl From<sqlx::Error> for JobManagementError {
    fn from(e: sqlx::Error) -> Self {
        JobManagementError::DatabaseError(e.to_string())
    }
}

/// Rejects the whole batch if any score is NaN or outside `[0, 100]`. Backends call this before writing anything.
pub fn check_scores(scores: &HashMap<UserId, f64>) -> Result<(), JobManagementError> {
    match scores.iter().find(|(_, s)| !(0.0..=100.0).contains(*s)) {
        Some((candidate, score)) => Err(JobManagementError::InvalidScore { candidate: candidate.clone(), score: *score }),
        None => Ok(()),
    }
}

/// Storage behaviour for jobs and the match score cache embedded in each job.
pub trait JobManagement: Clone + Send + Sync {
    /// Creates the job and consumes the payment that pays for it as one atomic unit. If the payment cannot be
    /// consumed by `recruiter` the job is not created and the ledger's rejection is returned as
    /// [`JobManagementError::PaymentRejected`].
    fn insert_job_consuming_payment(
        &self,
        recruiter: &UserId,
        job: NewJob,
        payment_id: PaymentId,
    ) -> impl Future<Output = Result<(Job, Payment), JobManagementError>> + Send;

    fn fetch_job(&self, id: JobId) -> impl Future<Output = Result<Option<Job>, JobManagementError>> + Send;

    fn fetch_jobs_for_recruiter(
        &self,
        recruiter: &UserId,
    ) -> impl Future<Output = Result<Vec<Job>, JobManagementError>> + Send;

    /// Records an application. Applying twice leaves a single entry.
    fn add_candidate(
        &self,
        job_id: JobId,
        candidate: &UserId,
    ) -> impl Future<Output = Result<Job, JobManagementError>> + Send;

    /// The cached score for the candidate, or `None` if it has never been computed. A cached score of zero is
    /// returned as `Some(0.0)`. Fails with [`JobManagementError::JobNotFound`] if the job does not exist.
    fn fetch_match_score(
        &self,
        job_id: JobId,
        candidate: &UserId,
    ) -> impl Future<Output = Result<Option<f64>, JobManagementError>> + Send;

    fn fetch_match_scores(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<HashMap<UserId, f64>, JobManagementError>> + Send;

    /// Merges `scores` into the job's cache: keys present in `scores` are overwritten, all others are left alone.
    /// Returns the number of entries written. A batch containing an invalid score is rejected as a whole with
    /// [`JobManagementError::InvalidScore`].
    fn merge_match_scores(
        &self,
        job_id: JobId,
        scores: &HashMap<UserId, f64>,
    ) -> impl Future<Output = Result<usize, JobManagementError>> + Send;
}
