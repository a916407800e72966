//! Many concurrent attempts to spend one payment must resolve to exactly one winner, on every backend.
use std::sync::Arc;

use futures_util::future::join_all;
use log::*;
use talent_engine::{
    db_types::{ConsumingAction, JobId, NewJob, Payer, PaymentPurpose, UserId, Wei},
    errors::ErrorKind,
    events::EventProducers,
    test_utils::{new_test_database, seed_verified_payment, StaticChainReader},
    traits::{JobManagement, PaymentLedgerError, PaymentManagement},
    JobPostingApi,
    MemoryDatabase,
    PaymentLedgerApi,
};

const NUM_ATTEMPTS: i64 = 20;

async fn consume_burst<B: PaymentManagement + 'static>(db: B) {
    let payment = seed_verified_payment(&db, 1, PaymentPurpose::JobPosting).await;
    let ledger = Arc::new(PaymentLedgerApi::new(db, StaticChainReader::new(), "testnet", EventProducers::default()));
    ledger.attach_payer(payment.id, Payer::recruiter("r1")).await.expect("Error attaching payer");

    let payment_id = payment.id;
    let attempts = (0..NUM_ATTEMPTS).map(|i| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger.consume(payment_id, &UserId::from("r1"), ConsumingAction::JobPosting(JobId::from(i))).await
        })
    });
    let results = join_all(attempts).await.into_iter().map(|r| r.expect("task panicked")).collect::<Vec<_>>();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one consumption must succeed");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, PaymentLedgerError::AlreadyConsumed(_)), "unexpected error: {err}");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
    let stored = ledger.fetch_payment(payment.id).await.unwrap().unwrap();
    assert!(stored.consumed);
    let winner = results.into_iter().find_map(|r| r.ok()).unwrap();
    assert_eq!(stored.consumed_by, winner.consumed_by);
    info!("🚀️ Burst of {NUM_ATTEMPTS} consumptions produced a single winner: {:?}", winner.consumed_by);
}

async fn create_job_burst<B: PaymentManagement + JobManagement + 'static>(db: B) {
    let payment = seed_verified_payment(&db, 2, PaymentPurpose::JobPosting).await;
    let api = Arc::new(JobPostingApi::new(db.clone(), EventProducers::default()));
    let fee = Wei::from_ether_str("0.1").unwrap();
    let payment_id = payment.id;

    let attempts = (0..NUM_ATTEMPTS).map(|i| {
        let api = Arc::clone(&api);
        tokio::spawn(async move {
            let job = NewJob::new(format!("Rust engineer #{i}"), "Build a payment ledger").with_skills(["rust"]);
            api.create_job(&UserId::from("r1"), job, payment_id, fee).await
        })
    });
    let results = join_all(attempts).await.into_iter().map(|r| r.expect("task panicked")).collect::<Vec<_>>();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {err}");
    }
    let jobs = db.fetch_jobs_for_recruiter(&UserId::from("r1")).await.unwrap();
    assert_eq!(jobs.len(), 1, "a failed attempt must not leave a job behind");
    let stored = db.fetch_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(stored.consumed_by, Some(ConsumingAction::JobPosting(jobs[0].id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_consume_burst() {
    consume_burst(new_test_database().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_consume_burst() {
    let _ = env_logger::try_init();
    consume_burst(MemoryDatabase::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_create_job_burst() {
    create_job_burst(new_test_database().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_create_job_burst() {
    let _ = env_logger::try_init();
    create_job_burst(MemoryDatabase::new()).await;
}

async fn payments_only_pay_for_their_purpose<B: PaymentManagement + 'static>(db: B) {
    let posting_fee = seed_verified_payment(&db, 4, PaymentPurpose::JobPosting).await;
    let ledger = PaymentLedgerApi::new(db.clone(), StaticChainReader::new(), "testnet", EventProducers::default());
    ledger.attach_payer(posting_fee.id, Payer::recruiter("r1")).await.expect("Error attaching payer");

    let err = ledger
        .consume(posting_fee.id, &UserId::from("r1"), ConsumingAction::PremiumUpgrade(UserId::from("r1")))
        .await
        .expect_err("a job posting fee cannot buy a premium upgrade");
    assert!(matches!(err, PaymentLedgerError::WrongPurpose {
        expected: PaymentPurpose::JobSeekerPremium,
        actual: PaymentPurpose::JobPosting,
        ..
    }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    let stored = ledger.fetch_payment(posting_fee.id).await.unwrap().unwrap();
    assert!(!stored.consumed);
    assert!(stored.consumed_by.is_none());

    let premium_fee = seed_verified_payment(&db, 5, PaymentPurpose::JobSeekerPremium).await;
    let err = db
        .attach_and_consume(premium_fee.id, &Payer::recruiter("r1"), &ConsumingAction::JobPosting(JobId::from(9)))
        .await
        .expect_err("a premium fee cannot pay for a job posting");
    assert!(matches!(err, PaymentLedgerError::WrongPurpose { expected: PaymentPurpose::JobPosting, .. }));
    let stored = ledger.fetch_payment(premium_fee.id).await.unwrap().unwrap();
    assert!(!stored.consumed);
    assert!(stored.payer.is_none(), "a rejected purchase must not attach the payer");

    // The right action still goes through afterwards
    let spent = ledger
        .consume(posting_fee.id, &UserId::from("r1"), ConsumingAction::JobPosting(JobId::from(1)))
        .await
        .expect("Error consuming payment");
    assert_eq!(spent.consumed_by, Some(ConsumingAction::JobPosting(JobId::from(1))));
}

#[tokio::test]
async fn sqlite_payments_only_pay_for_their_purpose() {
    payments_only_pay_for_their_purpose(new_test_database().await).await;
}

#[tokio::test]
async fn memory_payments_only_pay_for_their_purpose() {
    payments_only_pay_for_their_purpose(MemoryDatabase::new()).await;
}

#[tokio::test]
async fn consumed_payments_cannot_be_rewritten_in_sqlite() {
    let db = new_test_database().await;
    let payment = seed_verified_payment(&db, 3, PaymentPurpose::JobPosting).await;
    db.attach_payer(payment.id, &Payer::recruiter("r1")).await.unwrap();
    db.consume_payment(payment.id, &UserId::from("r1"), &ConsumingAction::JobPosting(JobId::from(1))).await.unwrap();
    let tampered = sqlx::query("UPDATE payments SET amount_wei = '1' WHERE id = ?")
        .bind(payment.id)
        .execute(db.pool())
        .await;
    assert!(tampered.is_err());
    let deleted = sqlx::query("DELETE FROM payments WHERE id = ?").bind(payment.id).execute(db.pool()).await;
    assert!(deleted.is_err());
}
