use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    db_types::{JobId, UserId},
    helpers::clamp_score,
    traits::{JobManagement, JobManagementError},
};

/// The per-job score cache. It has no storage of its own: entries live with the job they belong to, and this type is
/// the only path by which they are written.
#[derive(Clone)]
pub struct MatchScoreCache<B> {
    db: B,
}

impl<B> Debug for MatchScoreCache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchScoreCache")
    }
}

impl<B> MatchScoreCache<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> MatchScoreCache<B>
where B: JobManagement
{
    /// Looks up a cached score.
    ///
    /// `None` means the candidate has never been scored for this job. `Some(0.0)` is a real, if poor, score and is
    /// never reported as absent.
    pub async fn get(&self, job_id: JobId, candidate: &UserId) -> Result<Option<f64>, JobManagementError> {
        let score = self.db.fetch_match_score(job_id, candidate).await?;
        trace!("💾 Cache lookup for {candidate} on job #{job_id}: {score:?}");
        Ok(score)
    }

    /// Every cached score for the job.
    pub async fn snapshot(&self, job_id: JobId) -> Result<HashMap<UserId, f64>, JobManagementError> {
        self.db.fetch_match_scores(job_id).await
    }

    /// Merges `updates` into the job's cache. Keys in `updates` overwrite existing entries and every other entry is
    /// kept, so writers working on disjoint sets of candidates never lose each other's results.
    ///
    /// Scores are clamped to `[0, 100]` before they are stored and NaN scores are dropped, so every backend stores
    /// the same values.
    pub async fn merge_write_back(
        &self,
        job_id: JobId,
        updates: &HashMap<UserId, f64>,
    ) -> Result<usize, JobManagementError> {
        let updates = sanitize_scores(job_id, updates);
        if updates.is_empty() {
            return Ok(0);
        }
        let written = self.db.merge_match_scores(job_id, &updates).await?;
        debug!("💾 {written} scores written back for job #{job_id}");
        Ok(written)
    }
}

fn sanitize_scores(job_id: JobId, updates: &HashMap<UserId, f64>) -> HashMap<UserId, f64> {
    updates
        .iter()
        .filter_map(|(candidate, &score)| match clamp_score(score) {
            None => {
                warn!("💾 Dropping NaN score for {candidate} on job #{job_id}");
                None
            },
            Some(clamped) => {
                if clamped != score {
                    warn!("💾 Score {score} for {candidate} on job #{job_id} is out of range. Storing {clamped}");
                }
                Some((candidate.clone(), clamped))
            },
        })
        .collect()
}
