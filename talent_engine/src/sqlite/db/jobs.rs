use chrono::{DateTime, Utc};
use log::*;
use sqlx::{FromRow, SqliteConnection};

use super::{decode_string_list, encode_string_list, match_scores};
use crate::{
    db_types::{Job, JobId, NewJob, PaymentId, UserId},
    traits::{JobManagementError, PaymentLedgerError},
};

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub recruiter_id: String,
    pub payment_id: i64,
    pub title: String,
    pub description: String,
    pub skills: String,
    pub location: Option<String>,
    pub budget: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inserts the job record. A payment can back only one job, so a second job for the same payment fails with
/// [`PaymentLedgerError::AlreadyConsumed`]. A job for a payment that does not exist fails with
/// [`PaymentLedgerError::PaymentNotFound`].
pub async fn insert_job(
    recruiter: &UserId,
    job: &NewJob,
    payment_id: PaymentId,
    conn: &mut SqliteConnection,
) -> Result<JobId, JobManagementError> {
    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO jobs (recruiter_id, payment_id, title, description, skills, location, budget, created_at,
            updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id;
        "#,
    )
    .bind(recruiter.as_str())
    .bind(payment_id)
    .bind(job.title.as_str())
    .bind(job.description.as_str())
    .bind(encode_string_list(&job.skills))
    .bind(job.location.as_deref())
    .bind(job.budget.as_deref())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            JobManagementError::PaymentRejected(PaymentLedgerError::AlreadyConsumed(payment_id))
        },
        sqlx::Error::Database(err) if err.is_foreign_key_violation() => {
            JobManagementError::PaymentRejected(PaymentLedgerError::PaymentNotFound(payment_id))
        },
        _ => JobManagementError::from(e),
    })?;
    debug!("🗃️ Job #{id} inserted for {recruiter}");
    Ok(JobId::from(id))
}

async fn fetch_candidates(job_id: JobId, conn: &mut SqliteConnection) -> Result<Vec<UserId>, JobManagementError> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT candidate_id FROM job_candidates WHERE job_id = ? ORDER BY applied_at, rowid")
            .bind(job_id)
            .fetch_all(conn)
            .await?;
    Ok(ids.into_iter().map(UserId::from).collect())
}

/// Assembles a full job from its row, its applications and its score cache.
async fn hydrate(row: JobRow, conn: &mut SqliteConnection) -> Result<Job, JobManagementError> {
    let id = JobId::from(row.id);
    let skills = decode_string_list("skills", &row.skills)
        .map_err(|e| JobManagementError::CorruptRecord(format!("job #{id}: {e}")))?;
    let candidates = fetch_candidates(id, &mut *conn).await?;
    let match_scores = match_scores::fetch_scores(id, &mut *conn).await?;
    Ok(Job {
        id,
        recruiter_id: UserId::from(row.recruiter_id),
        payment_id: PaymentId::from(row.payment_id),
        title: row.title,
        description: row.description,
        skills,
        location: row.location,
        budget: row.budget,
        match_scores,
        candidates,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub async fn fetch_job(id: JobId, conn: &mut SqliteConnection) -> Result<Option<Job>, JobManagementError> {
    let row: Option<JobRow> =
        sqlx::query_as("SELECT * FROM jobs WHERE id = ?").bind(id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(Some(hydrate(row, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_jobs_for_recruiter(
    recruiter: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Job>, JobManagementError> {
    let rows: Vec<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE recruiter_id = ? ORDER BY created_at, id")
        .bind(recruiter.as_str())
        .fetch_all(&mut *conn)
        .await?;
    let mut jobs = Vec::with_capacity(rows.len());
    for row in rows {
        jobs.push(hydrate(row, &mut *conn).await?);
    }
    Ok(jobs)
}

/// Records an application. Returns false if the candidate had already applied.
pub async fn add_candidate(
    job_id: JobId,
    candidate: &UserId,
    conn: &mut SqliteConnection,
) -> Result<bool, JobManagementError> {
    let result = sqlx::query(
        r#"
            INSERT INTO job_candidates (job_id, candidate_id, applied_at) VALUES (?, ?, ?)
            ON CONFLICT (job_id, candidate_id) DO NOTHING;
        "#,
    )
    .bind(job_id)
    .bind(candidate.as_str())
    .bind(Utc::now())
    .execute(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_foreign_key_violation() => JobManagementError::JobNotFound(job_id),
        _ => JobManagementError::from(e),
    })?;
    Ok(result.rows_affected() > 0)
}
