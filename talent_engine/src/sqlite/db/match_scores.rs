use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{JobId, UserId},
    traits::JobManagementError,
};

async fn job_exists(job_id: JobId, conn: &mut SqliteConnection) -> Result<bool, JobManagementError> {
    let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = ?)").bind(job_id).fetch_one(conn).await?;
    Ok(exists)
}

/// Every cached score for the job. Fails with [`JobManagementError::JobNotFound`] if the job does not exist.
pub async fn fetch_scores(job_id: JobId, conn: &mut SqliteConnection) -> Result<HashMap<UserId, f64>, JobManagementError> {
    let rows: Vec<(String, f64)> = sqlx::query_as("SELECT candidate_id, score FROM job_match_scores WHERE job_id = ?")
        .bind(job_id)
        .fetch_all(&mut *conn)
        .await?;
    if rows.is_empty() && !job_exists(job_id, conn).await? {
        return Err(JobManagementError::JobNotFound(job_id));
    }
    Ok(rows.into_iter().map(|(id, score)| (UserId::from(id), score)).collect())
}

pub async fn fetch_score(
    job_id: JobId,
    candidate: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<f64>, JobManagementError> {
    // One row per existing job, with a NULL score when the candidate has not been scored
    let row: Option<Option<f64>> = sqlx::query_scalar(
        r#"
            SELECT s.score FROM jobs j
            LEFT JOIN job_match_scores s ON s.job_id = j.id AND s.candidate_id = ?
            WHERE j.id = ?
        "#,
    )
    .bind(candidate.as_str())
    .bind(job_id)
    .fetch_optional(conn)
    .await?;
    row.ok_or(JobManagementError::JobNotFound(job_id))
}

/// Writes each score with a per-key upsert. Rows for candidates not in `scores` are never touched. Scores for a job
/// that does not exist fail with [`JobManagementError::JobNotFound`].
pub async fn upsert_scores(
    job_id: JobId,
    scores: &HashMap<UserId, f64>,
    conn: &mut SqliteConnection,
) -> Result<usize, JobManagementError> {
    let now = Utc::now();
    let mut written = 0;
    for (candidate, score) in scores {
        let result = sqlx::query(
            r#"
                INSERT INTO job_match_scores (job_id, candidate_id, score, updated_at) VALUES (?, ?, ?, ?)
                ON CONFLICT (job_id, candidate_id) DO UPDATE SET score = excluded.score, updated_at = excluded.updated_at;
            "#,
        )
        .bind(job_id)
        .bind(candidate.as_str())
        .bind(*score)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(err) if err.is_foreign_key_violation() => JobManagementError::JobNotFound(job_id),
            _ => JobManagementError::from(e),
        })?;
        written += result.rows_affected() as usize;
    }
    Ok(written)
}
