use chrono::Utc;
use sqlx::{FromRow, SqliteConnection};

use super::{decode_string_list, encode_string_list};
use crate::{
    db_types::{CandidateProfile, UserId},
    traits::CandidatePoolError,
};

#[derive(Debug, Clone, FromRow)]
struct SeekerRow {
    id: String,
    name: String,
    email: Option<String>,
    bio: String,
    summary: String,
    skills: String,
    is_premium: bool,
}

impl From<SeekerRow> for CandidateProfile {
    fn from(row: SeekerRow) -> Self {
        // Skills only inform the scoring request, so an unreadable list degrades to "no skills".
        let skills = decode_string_list("skills", &row.skills).unwrap_or_else(|e| {
            log::warn!("🗃️ Seeker {}: {e}", row.id);
            Vec::new()
        });
        Self {
            id: UserId::from(row.id),
            name: row.name,
            email: row.email,
            bio: row.bio,
            summary: row.summary,
            skills,
            is_premium: row.is_premium,
        }
    }
}

pub async fn fetch_seekers(conn: &mut SqliteConnection) -> Result<Vec<CandidateProfile>, CandidatePoolError> {
    let rows: Vec<SeekerRow> =
        sqlx::query_as("SELECT id, name, email, bio, summary, skills, is_premium FROM seekers ORDER BY rowid")
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(CandidateProfile::from).collect())
}

pub async fn upsert_seeker(profile: CandidateProfile, conn: &mut SqliteConnection) -> Result<(), CandidatePoolError> {
    let now = Utc::now();
    sqlx::query(
        r#"
            INSERT INTO seekers (id, name, email, bio, summary, skills, is_premium, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                bio = excluded.bio,
                summary = excluded.summary,
                skills = excluded.skills,
                is_premium = excluded.is_premium,
                updated_at = excluded.updated_at;
        "#,
    )
    .bind(profile.id.as_str())
    .bind(profile.name.as_str())
    .bind(profile.email.as_deref())
    .bind(profile.bio.as_str())
    .bind(profile.summary.as_str())
    .bind(encode_string_list(&profile.skills))
    .bind(profile.is_premium)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
