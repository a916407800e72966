use cucumber::{given, then, when};
use talent_common::helpers::normalize_address;
use talent_engine::{
    chain::ChainTransfer,
    db_types::{ConsumingAction, NewJob, Payer, PaymentStatus, UserId, Wei},
    test_utils::tx_ref,
    traits::{JobManagement, PaymentManagement},
};

use crate::cucumber::{world::MarketplaceSystem, LedgerWorld};

fn ether(amount: &str) -> Wei {
    Wei::from_ether_str(amount).expect("Not a valid amount")
}

#[given(expr = "a fresh marketplace with platform wallet {string} and a fee of {word}")]
async fn fresh_marketplace(world: &mut LedgerWorld, wallet: String, fee: String) {
    let system = MarketplaceSystem::new(world.chain.clone(), wallet, ether(&fee)).await;
    world.system = Some(system);
}

fn register_transfer(world: &LedgerWorld, n: u64, amount: &str, recipient: &str, confirmed: bool) {
    let tx = tx_ref(n);
    let transfer =
        ChainTransfer { tx_ref: tx.clone(), recipient: Some(recipient.to_string()), amount: ether(amount), confirmed };
    let _ = world.chain.clone().with_result(&tx, Ok(transfer));
}

#[given(expr = "the chain has a confirmed transfer [{int}] of {word} to the platform wallet")]
async fn confirmed_transfer_to_platform(world: &mut LedgerWorld, n: u64, amount: String) {
    // Checksummed and lowercase forms of an address are the same address
    let wallet = normalize_address(&world.system().admin_wallet);
    register_transfer(world, n, &amount, &wallet, true);
}

#[given(expr = "the chain has a confirmed transfer [{int}] of {word} to {string}")]
async fn confirmed_transfer_to(world: &mut LedgerWorld, n: u64, amount: String, recipient: String) {
    register_transfer(world, n, &amount, &recipient, true);
}

#[given(expr = "the chain has a failed transfer [{int}] of {word} to the platform wallet")]
async fn failed_transfer(world: &mut LedgerWorld, n: u64, amount: String) {
    let wallet = world.system().admin_wallet.clone();
    register_transfer(world, n, &amount, &wallet, false);
}

#[when(expr = "I verify transaction [{int}]")]
async fn verify_transaction(world: &mut LedgerWorld, n: u64) {
    let system = world.system();
    let result = system.ledger.verify_and_store("rpc", &system.admin_wallet, tx_ref(n).as_str(), system.fee).await;
    if let Some(payment) = world.record(result.map_err(|e| e.kind())) {
        world.payment = Some(payment);
    }
}

#[when(expr = "recruiter {string} attaches the payment")]
async fn attach_payment(world: &mut LedgerWorld, recruiter: String) {
    let id = world.payment().id;
    let result = world.system().ledger.attach_payer(id, Payer::recruiter(recruiter)).await;
    world.record(result.map_err(|e| e.kind()));
}

#[when(expr = "recruiter {string} creates the job {string} with the payment")]
async fn create_job(world: &mut LedgerWorld, recruiter: String, title: String) {
    let id = world.payment().id;
    let system = world.system();
    let job = NewJob::new(title, "Build the payment ledger").with_skills(["rust", "sqlite"]);
    let result = system.jobs.create_job(&UserId::from(recruiter), job, id, system.fee).await;
    if let Some(job) = world.record(result.map_err(|e| e.kind())) {
        world.job = Some(job);
    }
}

#[when(expr = "job seeker {string} upgrades to premium with transaction [{int}]")]
async fn upgrade_to_premium(world: &mut LedgerWorld, seeker: String, n: u64) {
    let system = world.system();
    let seeker = UserId::from(seeker);
    let result =
        system.ledger.upgrade_to_premium("rpc", &system.admin_wallet, tx_ref(n).as_str(), system.fee, &seeker).await;
    if let Some(payment) = world.record(result.map_err(|e| e.kind())) {
        world.payment = Some(payment);
    }
}

#[then("the payment is verified and unconsumed")]
async fn payment_is_verified(world: &mut LedgerWorld) {
    let payment = world.payment();
    assert_eq!(payment.status, PaymentStatus::Verified);
    assert!(!payment.consumed, "Payment should not be consumed");
    assert!(payment.payer.is_none(), "Payment should not have a payer yet");
}

#[then("the payment is consumed by the job")]
async fn payment_consumed_by_job(world: &mut LedgerWorld) {
    let job = world.job.as_ref().expect("No job has been created");
    let payment = world.system().db.fetch_payment(world.payment().id).await.expect("Error fetching payment");
    let payment = payment.expect("Payment does not exist");
    assert!(payment.consumed, "Payment is not consumed");
    assert_eq!(payment.consumed_by, Some(ConsumingAction::JobPosting(job.id)));
    assert_eq!(job.payment_id, payment.id);
}

#[then(expr = "the payment is consumed by a premium upgrade for {string}")]
async fn payment_consumed_by_upgrade(world: &mut LedgerWorld, seeker: String) {
    let payment = world.payment();
    assert!(payment.consumed, "Payment is not consumed");
    assert_eq!(payment.consumed_by, Some(ConsumingAction::PremiumUpgrade(UserId::from(seeker.as_str()))));
    assert_eq!(payment.payer, Some(Payer::job_seeker(seeker)));
}

#[then(expr = "the payment belongs to {string}")]
async fn payment_belongs_to(world: &mut LedgerWorld, user: String) {
    let payment = world.system().db.fetch_payment(world.payment().id).await.expect("Error fetching payment");
    assert!(payment.expect("Payment does not exist").is_owned_by(&UserId::from(user)));
}

#[then(expr = "the request is rejected as {word}")]
async fn request_rejected(world: &mut LedgerWorld, kind: String) {
    let actual = world.last_error.expect("The last request succeeded");
    assert_eq!(format!("{actual:?}"), kind, "Unexpected failure: {actual}");
}

#[then(expr = "no payment is recorded for transaction [{int}]")]
async fn no_payment_recorded(world: &mut LedgerWorld, n: u64) {
    let found = world.system().db.fetch_payment_by_tx_ref(&tx_ref(n), "testnet").await.expect("Error fetching payment");
    assert!(found.is_none(), "A payment was recorded");
}

#[then(expr = "recruiter {string} has {int} job(s)")]
async fn recruiter_job_count(world: &mut LedgerWorld, recruiter: String, count: usize) {
    let jobs = world.system().db.fetch_jobs_for_recruiter(&UserId::from(recruiter)).await.expect("Error fetching jobs");
    assert_eq!(jobs.len(), count);
}
