use serde::{Deserialize, Serialize};

use crate::db_types::{CandidateProfile, Job, JobId, UserId};

/// The ranked candidates for one job, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub job_id: JobId,
    pub job_title: String,
    pub results: Vec<RankedCandidate>,
}

impl Ranking {
    pub fn empty(job: &Job) -> Self {
        Self { job_id: job.id, job_title: job.title.clone(), results: Vec::new() }
    }

    pub fn candidate_ids(&self) -> Vec<UserId> {
        self.results.iter().map(|r| r.candidate_id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate_id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub skills: Vec<String>,
    /// The fitment score in `(0, 100]`. This is the sort key.
    pub score: f64,
    /// Rule-based skill overlap, for display only.
    pub skill_overlap: f64,
    pub is_premium: bool,
    /// True if the score came from the job's cache rather than a fresh scoring call.
    pub from_cache: bool,
}

impl RankedCandidate {
    pub(crate) fn new(profile: &CandidateProfile, score: f64, skill_overlap: f64, from_cache: bool) -> Self {
        Self {
            candidate_id: profile.id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            skills: profile.skills.clone(),
            score,
            skill_overlap,
            is_premium: profile.is_premium,
            from_cache,
        }
    }
}

/// How many candidates reach the match threshold for one of a recruiter's jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSupply {
    pub job_id: JobId,
    pub job_title: String,
    pub matches: usize,
}

/// How many job seekers list a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFrequency {
    pub skill: String,
    pub count: usize,
}
