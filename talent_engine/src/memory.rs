//! An in-process backend that keeps everything in memory.
//!
//! All state sits behind a single mutex, and every trait method takes the lock exactly once and never holds it across
//! an await. Each method is therefore one critical section, which gives the same per-payment linearizability as the
//! conditional updates in the SQLite backend.
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use chrono::Utc;
use log::*;
use parking_lot::Mutex;

use crate::{
    db_types::{
        CandidateProfile,
        ConsumingAction,
        Job,
        JobId,
        NewJob,
        NewPayment,
        Payer,
        Payment,
        PaymentId,
        PaymentStatus,
        TxRef,
        UserId,
    },
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

#[derive(Default)]
struct MemoryState {
    payments: Vec<Payment>,
    jobs: Vec<Job>,
    seekers: Vec<CandidateProfile>,
}

impl MemoryState {
    fn payment_mut(&mut self, id: PaymentId) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|p| p.id == id)
    }

    fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == id)
    }

    fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn can_consume(&self, id: PaymentId, consumer: &UserId, action: &ConsumingAction) -> bool {
        self.payment(id)
            .map(|p| {
                !p.consumed &&
                    p.status == PaymentStatus::Verified &&
                    p.purpose == action.purpose() &&
                    p.is_owned_by(consumer)
            })
            .unwrap_or(false)
    }

    /// The in-memory counterpart of the conditional consume statement.
    fn consume(
        &mut self,
        id: PaymentId,
        consumer: &UserId,
        action: &ConsumingAction,
    ) -> Result<Payment, PaymentLedgerError> {
        if !self.can_consume(id, consumer, action) {
            return Err(consume_rejection(id, self.payment(id), consumer, action));
        }
        let payment = self.payment_mut(id).ok_or(PaymentLedgerError::PaymentNotFound(id))?;
        payment.consumed = true;
        payment.consumed_by = Some(action.clone());
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }
}

/// A backend for tests and single-process deployments. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        write!(f, "MemoryDatabase ({} payments, {} jobs)", state.payments.len(), state.jobs.len())
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentManagement for MemoryDatabase {
    async fn insert_verified_payment(&self, payment: NewPayment) -> Result<Payment, PaymentLedgerError> {
        let mut state = self.state.lock();
        if state.payments.iter().any(|p| p.tx_ref == payment.tx_ref && p.network == payment.network) {
            return Err(PaymentLedgerError::PaymentAlreadyExists(payment.tx_ref));
        }
        let now = Utc::now();
        let id = PaymentId::from(state.payments.len() as i64 + 1);
        let NewPayment { tx_ref, amount, recipient, network, purpose } = payment;
        let payment = Payment {
            id,
            tx_ref,
            amount,
            recipient,
            network,
            status: PaymentStatus::Verified,
            purpose,
            payer: None,
            consumed: false,
            consumed_by: None,
            created_at: now,
            updated_at: now,
        };
        state.payments.push(payment.clone());
        debug!("🗃️ Payment #{id} recorded for transaction {}", payment.tx_ref);
        Ok(payment)
    }

    async fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, PaymentLedgerError> {
        Ok(self.state.lock().payment(id).cloned())
    }

    async fn fetch_payment_by_tx_ref(&self, tx_ref: &TxRef, network: &str) -> Result<Option<Payment>, PaymentLedgerError> {
        let state = self.state.lock();
        Ok(state.payments.iter().find(|p| &p.tx_ref == tx_ref && p.network == network).cloned())
    }

    async fn attach_payer(&self, id: PaymentId, payer: &Payer) -> Result<Payment, PaymentLedgerError> {
        let mut state = self.state.lock();
        let payment = state.payment_mut(id).ok_or(PaymentLedgerError::PaymentNotFound(id))?;
        match payment.payer.as_ref().map(|current| current.id == payer.id) {
            None => {
                payment.payer = Some(payer.clone());
                payment.updated_at = Utc::now();
                debug!("🗃️ Payment #{id} attached to {payer}");
                Ok(payment.clone())
            },
            Some(true) => Ok(payment.clone()),
            Some(false) => Err(PaymentLedgerError::PaymentAlreadyAttached(id)),
        }
    }

    async fn consume_payment(
        &self,
        id: PaymentId,
        consumer: &UserId,
        action: &ConsumingAction,
    ) -> Result<Payment, PaymentLedgerError> {
        let payment = self.state.lock().consume(id, consumer, action)?;
        debug!("🗃️ Payment #{id} consumed by {action}");
        Ok(payment)
    }

    async fn attach_and_consume(
        &self,
        id: PaymentId,
        payer: &Payer,
        action: &ConsumingAction,
    ) -> Result<Payment, PaymentLedgerError> {
        let mut state = self.state.lock();
        let attachable = state
            .payment(id)
            .map(|p| {
                !p.consumed &&
                    p.status == PaymentStatus::Verified &&
                    p.purpose == action.purpose() &&
                    p.payer.as_ref().map(|c| c.id == payer.id).unwrap_or(true)
            })
            .unwrap_or(false);
        if !attachable {
            return Err(attach_and_consume_rejection(id, state.payment(id), payer, action));
        }
        let payment = state.payment_mut(id).ok_or(PaymentLedgerError::PaymentNotFound(id))?;
        payment.payer = Some(payer.clone());
        payment.consumed = true;
        payment.consumed_by = Some(action.clone());
        payment.updated_at = Utc::now();
        debug!("🗃️ Payment #{id} attached to {payer} and consumed by {action}");
        Ok(payment.clone())
    }

    async fn search_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, PaymentLedgerError> {
        let state = self.state.lock();
        Ok(state.payments.iter().filter(|p| filter.matches(p)).cloned().collect())
    }
}

impl JobManagement for MemoryDatabase {
    async fn insert_job_consuming_payment(
        &self,
        recruiter: &UserId,
        job: NewJob,
        payment_id: PaymentId,
    ) -> Result<(Job, Payment), JobManagementError> {
        let mut state = self.state.lock();
        let job_id = JobId::from(state.jobs.len() as i64 + 1);
        let payment = state.consume(payment_id, recruiter, &ConsumingAction::JobPosting(job_id))?;
        let now = Utc::now();
        let NewJob { title, description, skills, location, budget } = job;
        let job = Job {
            id: job_id,
            recruiter_id: recruiter.clone(),
            payment_id,
            title,
            description,
            skills,
            location,
            budget,
            match_scores: HashMap::new(),
            candidates: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());
        debug!("🗃️ Job #{job_id} created by {recruiter}, paid for with payment #{payment_id}");
        Ok((job, payment))
    }

    async fn fetch_job(&self, id: JobId) -> Result<Option<Job>, JobManagementError> {
        Ok(self.state.lock().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn fetch_jobs_for_recruiter(&self, recruiter: &UserId) -> Result<Vec<Job>, JobManagementError> {
        let state = self.state.lock();
        Ok(state.jobs.iter().filter(|j| &j.recruiter_id == recruiter).cloned().collect())
    }

    async fn add_candidate(&self, job_id: JobId, candidate: &UserId) -> Result<Job, JobManagementError> {
        let mut state = self.state.lock();
        let job = state.job_mut(job_id).ok_or(JobManagementError::JobNotFound(job_id))?;
        if !job.candidates.contains(candidate) {
            job.candidates.push(candidate.clone());
            job.updated_at = Utc::now();
        }
        Ok(job.clone())
    }

    async fn fetch_match_score(&self, job_id: JobId, candidate: &UserId) -> Result<Option<f64>, JobManagementError> {
        let mut state = self.state.lock();
        let job = state.job_mut(job_id).ok_or(JobManagementError::JobNotFound(job_id))?;
        Ok(job.match_scores.get(candidate).copied())
    }

    async fn fetch_match_scores(&self, job_id: JobId) -> Result<HashMap<UserId, f64>, JobManagementError> {
        let mut state = self.state.lock();
        let job = state.job_mut(job_id).ok_or(JobManagementError::JobNotFound(job_id))?;
        Ok(job.match_scores.clone())
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
        let mut state = self.state.lock();
        let job = state.job_mut(job_id).ok_or(JobManagementError::JobNotFound(job_id))?;
        job.match_scores.extend(scores.iter().map(|(k, v)| (k.clone(), *v)));
        trace!("🗃️ Merged {} match scores into job #{job_id}", scores.len());
        Ok(scores.len())
    }
}

impl CandidatePool for MemoryDatabase {
    async fn fetch_seekers(&self) -> Result<Vec<CandidateProfile>, CandidatePoolError> {
        Ok(self.state.lock().seekers.clone())
    }

    async fn upsert_seeker(&self, profile: CandidateProfile) -> Result<(), CandidatePoolError> {
        let mut state = self.state.lock();
        match state.seekers.iter_mut().find(|s| s.id == profile.id) {
            Some(existing) => *existing = profile,
            None => state.seekers.push(profile),
        }
        Ok(())
    }
}
