use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::FutureExt;
use log::*;
use parking_lot::Mutex;
use talent_engine::{
    db_types::{ConsumingAction, NewJob, UserId, Wei},
    events::{EventHandlers, EventHooks},
    test_utils::{tx_ref, StaticChainReader, TEST_ADMIN_WALLET},
    JobPostingApi,
    MemoryDatabase,
    PaymentLedgerApi,
};
use tokio::runtime::Runtime;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }

    /// Handlers run on their own tasks, so give them a moment to catch up.
    pub async fn wait_for(&self, count: i32) {
        for _ in 0..100 {
            if self.count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

fn fee() -> Wei {
    Wei::from_ether_str("0.1").unwrap()
}

#[test]
fn on_payment_verified() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    rt.block_on(async {
        let mut hooks = EventHooks::default();
        hooks.on_payment_verified(move |ev| {
            info!("🪝️ {:?}", ev.payment);
            event_copy.called();
            async {}.boxed()
        });
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let chain = StaticChainReader::new()
            .with_transfer(&tx_ref(1), TEST_ADMIN_WALLET, "0.1")
            .with_transfer(&tx_ref(2), TEST_ADMIN_WALLET, "0.25");
        let api = PaymentLedgerApi::new(MemoryDatabase::new(), chain, "testnet", producers);
        api.verify_and_store("rpc", TEST_ADMIN_WALLET, tx_ref(1).as_str(), fee()).await.expect("Error verifying");
        api.verify_and_store("rpc", TEST_ADMIN_WALLET, tx_ref(2).as_str(), fee()).await.expect("Error verifying");
        // A rejected transfer does not notify anyone
        let _ = api.verify_and_store("rpc", TEST_ADMIN_WALLET, tx_ref(3).as_str(), fee()).await.unwrap_err();
        event.wait_for(2).await;
    });
    assert_eq!(event.count(), 2);
    info!("🪝️ test complete");
}

#[test]
fn on_payment_consumed() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    let actions = Arc::new(Mutex::new(Vec::new()));
    let actions_copy = Arc::clone(&actions);
    rt.block_on(async {
        let mut hooks = EventHooks::default();
        hooks.on_payment_consumed(move |ev| {
            info!("🪝️ {} spent on {}", ev.payment.id, ev.action);
            event_copy.called();
            actions_copy.lock().push(ev.action);
            async {}.boxed()
        });
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = MemoryDatabase::new();
        let chain = StaticChainReader::new()
            .with_transfer(&tx_ref(1), TEST_ADMIN_WALLET, "0.1")
            .with_transfer(&tx_ref(2), TEST_ADMIN_WALLET, "0.1");
        let ledger = PaymentLedgerApi::new(db.clone(), chain, "testnet", producers.clone());
        let jobs = JobPostingApi::new(db, producers);

        let seeker = UserId::from("s1");
        ledger.upgrade_to_premium("rpc", TEST_ADMIN_WALLET, tx_ref(1).as_str(), fee(), &seeker).await.unwrap();
        let payment = ledger.verify_and_store("rpc", TEST_ADMIN_WALLET, tx_ref(2).as_str(), fee()).await.unwrap();
        let job = jobs.create_job(&UserId::from("r1"), NewJob::new("Dev", "Rust"), payment.id, fee()).await.unwrap();
        event.wait_for(2).await;
        // Handlers run concurrently, so the order of arrival is not fixed
        let actions = actions.lock().clone();
        assert_eq!(actions.len(), 2);
        assert!(actions.contains(&ConsumingAction::PremiumUpgrade(seeker)));
        assert!(actions.contains(&ConsumingAction::JobPosting(job.id)));
    });
    assert_eq!(event.count(), 2);
    info!("🪝️ test complete");
}
