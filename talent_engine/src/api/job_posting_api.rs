use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ConsumingAction, Job, JobId, NewJob, Payer, PaymentId, PaymentPurpose, PaymentStatus, UserId, Wei},
    events::{EventProducers, PaymentConsumedEvent},
    traits::{JobManagement, JobManagementError, PaymentLedgerError, PaymentManagement},
};

/// `JobPostingApi` creates jobs, which are paid for with a verified job posting payment, and records applications.
pub struct JobPostingApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for JobPostingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JobPostingApi")
    }
}

impl<B> JobPostingApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> JobPostingApi<B>
where B: JobManagement + PaymentManagement
{
    /// Creates a job for `recruiter`, spending the payment as the fee.
    ///
    /// The payment must be a verified, unspent job posting payment worth at least `min_fee`, and must belong to the
    /// recruiter. A payment with no payer yet is attached to the recruiter first. The job is only created if the
    /// payment is consumed, so of two concurrent requests with the same payment at most one creates a job and the
    /// other fails with a `Conflict`.
    pub async fn create_job(
        &self,
        recruiter: &UserId,
        job: NewJob,
        payment_id: PaymentId,
        min_fee: Wei,
    ) -> Result<Job, JobManagementError> {
        if job.title.trim().is_empty() {
            return Err(JobManagementError::MissingTitle);
        }
        let payment = self.db.fetch_payment(payment_id).await?.ok_or(PaymentLedgerError::PaymentNotFound(payment_id))?;
        if payment.status != PaymentStatus::Verified {
            return Err(PaymentLedgerError::PaymentNotVerified(payment_id).into());
        }
        if payment.purpose != PaymentPurpose::JobPosting {
            return Err(PaymentLedgerError::WrongPurpose {
                payment: payment_id,
                expected: PaymentPurpose::JobPosting,
                actual: payment.purpose,
            }
            .into());
        }
        if payment.amount < min_fee {
            return Err(PaymentLedgerError::InsufficientAmount { required: min_fee, actual: payment.amount }.into());
        }
        if payment.consumed {
            info!("📋 {recruiter} tried to reuse payment #{payment_id}, which has already been spent");
            return Err(PaymentLedgerError::AlreadyConsumed(payment_id).into());
        }
        match &payment.payer {
            None => {
                self.db.attach_payer(payment_id, &Payer::recruiter(recruiter.clone())).await?;
                debug!("📋 Payment #{payment_id} attached to {recruiter}");
            },
            Some(payer) if &payer.id != recruiter => {
                warn!("📋 {recruiter} tried to post a job with payment #{payment_id}, which belongs to {}", payer.id);
                return Err(PaymentLedgerError::NotPaymentOwner { payment: payment_id, user: recruiter.clone() }.into());
            },
            Some(_) => {},
        }
        let (job, payment) = self.db.insert_job_consuming_payment(recruiter, job, payment_id).await?;
        info!("📋 Job #{} \"{}\" created by {recruiter} with payment #{payment_id}", job.id, job.title);
        for emitter in &self.producers.payment_consumed_producer {
            debug!("📋 Notifying payment consumed hook subscribers");
            let event = PaymentConsumedEvent::new(payment.clone(), ConsumingAction::JobPosting(job.id));
            emitter.publish_event(event).await;
        }
        Ok(job)
    }

    /// Records `seeker`'s application to the job. Applying again has no further effect.
    pub async fn apply(&self, job_id: JobId, seeker: &UserId) -> Result<Job, JobManagementError> {
        let job = self.db.add_candidate(job_id, seeker).await?;
        debug!("📋 {seeker} has applied to job #{job_id}");
        Ok(job)
    }

    pub async fn fetch_job(&self, job_id: JobId) -> Result<Option<Job>, JobManagementError> {
        self.db.fetch_job(job_id).await
    }

    pub async fn jobs_for_recruiter(&self, recruiter: &UserId) -> Result<Vec<Job>, JobManagementError> {
        self.db.fetch_jobs_for_recruiter(recruiter).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{errors::ErrorKind, memory::MemoryDatabase, test_utils::seed_verified_payment};

    fn fee() -> Wei {
        Wei::from_ether_str("0.1").unwrap()
    }

    fn job() -> NewJob {
        NewJob::new("Rust engineer", "Build a payment ledger").with_skills(["rust"]).with_location("Remote")
    }

    #[tokio::test]
    async fn a_payment_pays_for_one_job() {
        let db = MemoryDatabase::new();
        let payment = seed_verified_payment(&db, 1, PaymentPurpose::JobPosting).await;
        let api = JobPostingApi::new(db.clone(), EventProducers::default());
        let r1 = UserId::from("r1");

        let created = api.create_job(&r1, job(), payment.id, fee()).await.unwrap();
        assert_eq!(created.recruiter_id, r1);
        assert_eq!(created.payment_id, payment.id);
        assert!(created.match_scores.is_empty());
        assert!(created.candidates.is_empty());
        let stored = db.fetch_payment(payment.id).await.unwrap().unwrap();
        assert!(stored.is_owned_by(&r1));
        assert_eq!(stored.consumed_by, Some(ConsumingAction::JobPosting(created.id)));

        let err = api.create_job(&r1, job(), payment.id, fee()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(api.jobs_for_recruiter(&r1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn payments_must_fit_the_job() {
        let db = MemoryDatabase::new();
        let api = JobPostingApi::new(db.clone(), EventProducers::default());
        let r1 = UserId::from("r1");

        let err = api.create_job(&r1, NewJob::new("  ", "text"), PaymentId::from(1), fee()).await.unwrap_err();
        assert!(matches!(err, JobManagementError::MissingTitle));
        let err = api.create_job(&r1, job(), PaymentId::from(1), fee()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let premium = seed_verified_payment(&db, 1, PaymentPurpose::JobSeekerPremium).await;
        let err = api.create_job(&r1, job(), premium.id, fee()).await.unwrap_err();
        assert!(matches!(err, JobManagementError::PaymentRejected(PaymentLedgerError::WrongPurpose { .. })));

        let payment = seed_verified_payment(&db, 2, PaymentPurpose::JobPosting).await;
        let err = api.create_job(&r1, job(), payment.id, Wei::from_ether(1)).await.unwrap_err();
        assert!(matches!(err, JobManagementError::PaymentRejected(PaymentLedgerError::InsufficientAmount { .. })));

        db.attach_payer(payment.id, &Payer::recruiter("r2")).await.unwrap();
        let err = api.create_job(&r1, job(), payment.id, fee()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(api.jobs_for_recruiter(&r1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn applying_twice_records_one_application() {
        let db = MemoryDatabase::new();
        let payment = seed_verified_payment(&db, 1, PaymentPurpose::JobPosting).await;
        let api = JobPostingApi::new(db, EventProducers::default());
        let job = api.create_job(&UserId::from("r1"), job(), payment.id, fee()).await.unwrap();
        let seeker = UserId::from("s1");
        api.apply(job.id, &seeker).await.unwrap();
        let job = api.apply(job.id, &seeker).await.unwrap();
        assert_eq!(job.candidates, vec![seeker.clone()]);
        let err = api.apply(JobId::from(99), &seeker).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
