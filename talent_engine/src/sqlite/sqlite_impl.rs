//! `SqliteDatabase` is a concrete implementation of a talent engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Multi-statement operations run inside a transaction; single-statement operations rely on SQLite's
//! statement atomicity.
use std::{collections::HashMap, fmt::Debug};

use log::*;
use sqlx::{
    migrate::{MigrateDatabase, MigrateError},
    Sqlite,
    SqlitePool,
};

use super::db::{jobs, match_scores, new_pool, payments, seekers};
use crate::{
    db_types::{CandidateProfile, ConsumingAction, Job, JobId, NewJob, NewPayment, Payer, Payment, PaymentId, TxRef, UserId},
    traits::{
        attach_and_consume_rejection,
        check_scores,
        consume_rejection,
        CandidatePool,
        CandidatePoolError,
        JobManagement,
        JobManagementError,
        PaymentLedgerError,
        PaymentManagement,
        PaymentQueryFilter,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates an empty database at `url` if there is none yet. Returns true if one was created.
    pub async fn create_if_missing(url: &str) -> Result<bool, sqlx::Error> {
        if Sqlite::database_exists(url).await? {
            return Ok(false);
        }
        Sqlite::create_database(url).await?;
        info!("🗃️ Created database {url}");
        Ok(true)
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_verified_payment(&self, payment: NewPayment) -> Result<Payment, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::insert_verified(payment, &mut conn).await?;
        debug!("🗃️ Payment #{} recorded for transaction {}", payment.id, payment.tx_ref);
        Ok(payment)
    }

    async fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(id, &mut conn).await
    }

    async fn fetch_payment_by_tx_ref(&self, tx_ref: &TxRef, network: &str) -> Result<Option<Payment>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_by_tx_ref(tx_ref, network, &mut conn).await
    }

    async fn attach_payer(&self, id: PaymentId, payer: &Payer) -> Result<Payment, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(payment) = payments::attach_payer_if_unset(id, payer, &mut conn).await? {
            debug!("🗃️ Payment #{id} attached to {payer}");
            return Ok(payment);
        }
        match payments::fetch_payment(id, &mut conn).await? {
            None => Err(PaymentLedgerError::PaymentNotFound(id)),
            Some(p) if p.is_owned_by(&payer.id) => Ok(p),
            Some(_) => Err(PaymentLedgerError::PaymentAlreadyAttached(id)),
        }
    }

    async fn consume_payment(
        &self,
        id: PaymentId,
        consumer: &UserId,
        action: &ConsumingAction,
    ) -> Result<Payment, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(payment) = payments::consume_if_unconsumed(id, consumer, action, &mut conn).await? {
            debug!("🗃️ Payment #{id} consumed by {action}");
            return Ok(payment);
        }
        let current = payments::fetch_payment(id, &mut conn).await?;
        Err(consume_rejection(id, current.as_ref(), consumer, action))
    }

    async fn attach_and_consume(
        &self,
        id: PaymentId,
        payer: &Payer,
        action: &ConsumingAction,
    ) -> Result<Payment, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(payment) = payments::attach_and_consume_if_unconsumed(id, payer, action, &mut conn).await? {
            debug!("🗃️ Payment #{id} attached to {payer} and consumed by {action}");
            return Ok(payment);
        }
        let current = payments::fetch_payment(id, &mut conn).await?;
        Err(attach_and_consume_rejection(id, current.as_ref(), payer, action))
    }

    async fn search_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::search_payments(filter, &mut conn).await
    }
}

impl JobManagement for SqliteDatabase {
    /// Inserts the job and consumes the payment in one transaction. The consumption is the same conditional update
    /// used by [`PaymentManagement::consume_payment`], so a job is only ever committed together with the payment
    /// that paid for it.
    async fn insert_job_consuming_payment(
        &self,
        recruiter: &UserId,
        job: NewJob,
        payment_id: PaymentId,
    ) -> Result<(Job, Payment), JobManagementError> {
        // The insert must be the first statement, so that the transaction holds the write lock from the start.
        let mut tx = self.pool.begin().await?;
        let job_id = jobs::insert_job(recruiter, &job, payment_id, &mut tx).await?;
        let action = ConsumingAction::JobPosting(job_id);
        let payment = match payments::consume_if_unconsumed(payment_id, recruiter, &action, &mut tx).await? {
            Some(p) => p,
            None => {
                let current = payments::fetch_payment(payment_id, &mut tx).await?;
                tx.rollback().await?;
                return Err(consume_rejection(payment_id, current.as_ref(), recruiter, &action).into());
            },
        };
        let job = jobs::fetch_job(job_id, &mut tx).await?.ok_or(JobManagementError::JobNotFound(job_id))?;
        tx.commit().await?;
        debug!("🗃️ Job #{job_id} created by {recruiter}, paid for with payment #{payment_id}");
        Ok((job, payment))
    }

    async fn fetch_job(&self, id: JobId) -> Result<Option<Job>, JobManagementError> {
        let mut conn = self.pool.acquire().await?;
        jobs::fetch_job(id, &mut conn).await
    }

    async fn fetch_jobs_for_recruiter(&self, recruiter: &UserId) -> Result<Vec<Job>, JobManagementError> {
        let mut conn = self.pool.acquire().await?;
        jobs::fetch_jobs_for_recruiter(recruiter, &mut conn).await
    }

    async fn add_candidate(&self, job_id: JobId, candidate: &UserId) -> Result<Job, JobManagementError> {
        let mut tx = self.pool.begin().await?;
        if jobs::add_candidate(job_id, candidate, &mut tx).await? {
            debug!("🗃️ {candidate} applied to job #{job_id}");
        }
        let job = jobs::fetch_job(job_id, &mut tx).await?.ok_or(JobManagementError::JobNotFound(job_id))?;
        tx.commit().await?;
        Ok(job)
    }

    async fn fetch_match_score(&self, job_id: JobId, candidate: &UserId) -> Result<Option<f64>, JobManagementError> {
        let mut conn = self.pool.acquire().await?;
        match_scores::fetch_score(job_id, candidate, &mut conn).await
    }

    async fn fetch_match_scores(&self, job_id: JobId) -> Result<HashMap<UserId, f64>, JobManagementError> {
        let mut conn = self.pool.acquire().await?;
        match_scores::fetch_scores(job_id, &mut conn).await
    }

    async fn merge_match_scores(
        &self,
        job_id: JobId,
        scores: &HashMap<UserId, f64>,
    ) -> Result<usize, JobManagementError> {
        if scores.is_empty() {
            return Ok(0);
        }
        check_scores(scores)?;
        let mut tx = self.pool.begin().await?;
        let written = match_scores::upsert_scores(job_id, scores, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Merged {written} match scores into job #{job_id}");
        Ok(written)
    }
}

impl CandidatePool for SqliteDatabase {
    async fn fetch_seekers(&self) -> Result<Vec<CandidateProfile>, CandidatePoolError> {
        let mut conn = self.pool.acquire().await?;
        seekers::fetch_seekers(&mut conn).await
    }

    async fn upsert_seeker(&self, profile: CandidateProfile) -> Result<(), CandidatePoolError> {
        let mut conn = self.pool.acquire().await?;
        seekers::upsert_seeker(profile, &mut conn).await
    }
}
