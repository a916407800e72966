use std::{collections::HashMap, fmt::Debug, time::Duration};

use futures_util::{stream, StreamExt};
use log::*;

use crate::{
    api::{
        errors::RankingError,
        match_score_cache::MatchScoreCache,
        ranking_objects::{MatchSupply, RankedCandidate, Ranking, SkillFrequency},
    },
    config::ScoringConfig,
    db_types::{CandidateProfile, Job, JobId, UserId},
    helpers::{clamp_score, display_skill_name, skill_overlap_score},
    scoring::{ScoreRequest, ScoringClient, ScoringError},
    traits::{CandidatePool, JobManagement},
    write_back::WriteBackQueue,
};

/// The number of skills reported by [`RankingApi::skill_frequencies`] unless asked otherwise.
pub const DEFAULT_SKILL_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct RankingOptions {
    /// Upper bound on each scoring call. A call that runs over counts as a failure for that candidate.
    pub scoring_timeout: Duration,
    /// Maximum number of scoring calls in flight for one job.
    pub max_concurrent: usize,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self { scoring_timeout: Duration::from_secs(30), max_concurrent: 8 }
    }
}

impl From<&ScoringConfig> for RankingOptions {
    fn from(config: &ScoringConfig) -> Self {
        Self { scoring_timeout: config.timeout, max_concurrent: config.max_concurrent }
    }
}

/// A candidate whose score is known, either from the cache or from a successful scoring call.
struct ResolvedScore<'a> {
    profile: &'a CandidateProfile,
    score: f64,
    from_cache: bool,
}

/// `RankingApi` orders the job seeker pool by fitment to a job.
///
/// Cached scores are trusted as they are. Gaps are filled by the scoring client, and the new scores are handed to the
/// write-back queue after the result has been assembled. Candidates that cannot be scored, or that score zero, are left
/// out of the ranking rather than ranked at zero.
pub struct RankingApi<B, S> {
    db: B,
    cache: MatchScoreCache<B>,
    scorer: S,
    write_back: WriteBackQueue,
    options: RankingOptions,
}

impl<B, S> Debug for RankingApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RankingApi ({:?})", self.options)
    }
}

impl<B: Clone, S> RankingApi<B, S> {
    pub fn new(db: B, scorer: S, write_back: WriteBackQueue, options: RankingOptions) -> Self {
        let cache = MatchScoreCache::new(db.clone());
        Self { db, cache, scorer, write_back, options }
    }

    pub fn cache(&self) -> &MatchScoreCache<B> {
        &self.cache
    }
}

impl<B, S> RankingApi<B, S>
where B: CandidatePool
{
    /// The `limit` most common skills across the job seeker pool, most common first.
    ///
    /// Skill names are counted in their display form (see [`display_skill_name`]), so `"spring boot"` and
    /// `"Spring  Boot"` are the same skill. Blank entries are skipped. Equal counts are ordered by name.
    pub async fn skill_frequencies(&self, limit: usize) -> Result<Vec<SkillFrequency>, RankingError> {
        let pool = self.db.fetch_seekers().await?;
        let mut counts = HashMap::<String, usize>::new();
        for skill in pool.iter().flat_map(|p| p.skills.iter()) {
            let name = display_skill_name(skill);
            if !name.is_empty() {
                *counts.entry(name).or_default() += 1;
            }
        }
        let mut frequencies =
            counts.into_iter().map(|(skill, count)| SkillFrequency { skill, count }).collect::<Vec<_>>();
        frequencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
        frequencies.truncate(limit);
        debug!("🎯 {} distinct skills across {} job seekers", frequencies.len(), pool.len());
        Ok(frequencies)
    }
}

impl<B, S> RankingApi<B, S>
where
    B: JobManagement + CandidatePool,
    S: ScoringClient,
{
    /// Ranks the job seeker pool against the job, best match first.
    ///
    /// Only the recruiter who owns the job may rank it. A job without a description has nothing to score against and
    /// yields an empty ranking. Ties keep the pool's order, so ranking the same scores twice gives the same result.
    pub async fn rank(&self, job_id: JobId, requester: &UserId) -> Result<Ranking, RankingError> {
        let job = self.fetch_owned_job(job_id, requester).await?;
        if job.description.trim().is_empty() {
            info!("🎯 Job #{job_id} has no description. Returning an empty ranking");
            return Ok(Ranking::empty(&job));
        }
        let pool = self.db.fetch_seekers().await?;
        let resolved = self.resolve_scores(&job, &pool).await;
        let mut results = resolved
            .into_iter()
            .filter(|r| r.score > 0.0)
            .map(|r| {
                let overlap = skill_overlap_score(&job.skills, &r.profile.skills);
                RankedCandidate::new(r.profile, r.score, overlap, r.from_cache)
            })
            .collect::<Vec<_>>();
        // sort_by is stable, which preserves pool order between equal scores
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!("🎯 Ranked {} of {} candidates for job #{job_id}", results.len(), pool.len());
        Ok(Ranking { job_id: job.id, job_title: job.title, results })
    }

    /// For each of the recruiter's jobs, counts the candidates whose score is at least `threshold`. Jobs with the most
    /// matches come first.
    ///
    /// Scores are resolved exactly as for [`Self::rank`], including the write-back of new scores.
    pub async fn match_supply(&self, recruiter: &UserId, threshold: f64) -> Result<Vec<MatchSupply>, RankingError> {
        let jobs = self.db.fetch_jobs_for_recruiter(recruiter).await?;
        let pool = self.db.fetch_seekers().await?;
        let mut supply = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let matches = if job.description.trim().is_empty() {
                0
            } else {
                self.resolve_scores(job, &pool).await.iter().filter(|r| r.score >= threshold).count()
            };
            supply.push(MatchSupply { job_id: job.id, job_title: job.title.clone(), matches });
        }
        supply.sort_by(|a, b| b.matches.cmp(&a.matches));
        debug!("🎯 Match supply computed for {} jobs of {recruiter}", supply.len());
        Ok(supply)
    }

    async fn fetch_owned_job(&self, job_id: JobId, requester: &UserId) -> Result<Job, RankingError> {
        let job = self.db.fetch_job(job_id).await?.ok_or(RankingError::JobNotFound(job_id))?;
        if &job.recruiter_id != requester {
            warn!("🎯 {requester} tried to rank job #{job_id}, which belongs to {}", job.recruiter_id);
            return Err(RankingError::NotJobOwner { job: job_id, user: requester.clone() });
        }
        Ok(job)
    }

    /// Resolves a score for every scoreable candidate in the pool, in pool order. Cached scores are used as they are,
    /// everything else is scored with bounded concurrency. Candidates whose scoring failed are absent from the result.
    ///
    /// New scores, zeros included, are queued for write-back before returning.
    async fn resolve_scores<'a>(&self, job: &Job, pool: &'a [CandidateProfile]) -> Vec<ResolvedScore<'a>> {
        let candidates = pool.iter().filter_map(|p| p.scoring_text().map(|text| (p, text))).collect::<Vec<_>>();
        let outcomes = stream::iter(candidates)
            .map(|(profile, text)| async move {
                match job.match_scores.get(&profile.id) {
                    Some(cached) => Some((profile, clamp_score(*cached), true)),
                    None => match self.score_candidate(job, profile, text).await {
                        Ok(score) => Some((profile, clamp_score(score), false)),
                        Err(e) => {
                            debug!("🎯 Skipping {} for job #{}. {e}", profile.id, job.id);
                            None
                        },
                    },
                }
            })
            .buffered(self.options.max_concurrent.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut fresh = HashMap::new();
        let mut resolved = Vec::with_capacity(outcomes.len());
        for (profile, score, from_cache) in outcomes.into_iter().flatten() {
            let Some(score) = score else {
                debug!("🎯 Skipping {} for job #{}. The score is not a number", profile.id, job.id);
                continue;
            };
            if !from_cache {
                fresh.insert(profile.id.clone(), score);
            }
            resolved.push(ResolvedScore { profile, score, from_cache });
        }
        if !fresh.is_empty() {
            trace!("🎯 {} new scores for job #{}", fresh.len(), job.id);
            self.write_back.schedule(job.id, fresh);
        }
        resolved
    }

    async fn score_candidate(&self, job: &Job, profile: &CandidateProfile, text: &str) -> Result<f64, ScoringError> {
        let request = ScoreRequest {
            job_text: &job.description,
            candidate_text: text,
            required_skills: &job.skills,
            candidate_skills: &profile.skills,
        };
        tokio::time::timeout(self.options.scoring_timeout, self.scorer.score(request))
            .await
            .map_err(|_| ScoringError::Timeout)?
    }
}
