//! Access to the external fitment scoring capability.
//!
//! The capability is slow and unreliable. [`ScoringClient`] implementations make a single attempt per call and never
//! retry; callers bound each call with their own timeout.
mod http_client;

use std::future::Future;

pub use http_client::HttpScoringClient;
use serde::Serialize;
use thiserror::Error;

use crate::errors::ErrorKind;

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    #[error("The scoring service is unavailable: {0}")]
    Unavailable(String),
    #[error("The scoring service did not respond in time")]
    Timeout,
    #[error("The scoring service returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl ScoringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoringError::Unavailable(_) | ScoringError::Timeout => ErrorKind::UpstreamUnavailable,
            ScoringError::MalformedResponse(_) => ErrorKind::DataIntegrity,
        }
    }
}

/// The inputs to a fitment score. Serialized as the body of a `/match` request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreRequest<'a> {
    #[serde(rename = "job_description")]
    pub job_text: &'a str,
    #[serde(rename = "candidate_bio")]
    pub candidate_text: &'a str,
    #[serde(rename = "job_skills")]
    pub required_skills: &'a [String],
    pub candidate_skills: &'a [String],
}

pub trait ScoringClient: Clone + Send + Sync {
    /// Scores how well the candidate fits the job. Successful results are finite but are not guaranteed to lie in
    /// `[0, 100]`; callers clamp.
    fn score(&self, request: ScoreRequest<'_>) -> impl Future<Output = Result<f64, ScoringError>> + Send;

    /// Extracts skill names from free text. Unrecognised response shapes yield an empty list.
    fn extract_skills(&self, text: &str) -> impl Future<Output = Result<Vec<String>, ScoringError>> + Send;
}
