use cucumber::World;
use log::*;
use talent_engine::{
    db_types::{Job, Payment, Wei},
    errors::ErrorKind,
    events::EventProducers,
    test_utils::{create_database, random_db_path, run_migrations, StaticChainReader},
    JobPostingApi,
    PaymentLedgerApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<MarketplaceSystem>,
    pub chain: StaticChainReader,
    /// The payment the scenario is working with.
    pub payment: Option<Payment>,
    pub job: Option<Job>,
    /// The kind of the most recent failure, cleared by every successful request.
    pub last_error: Option<ErrorKind>,
}

#[derive(Debug)]
pub struct MarketplaceSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub ledger: PaymentLedgerApi<SqliteDatabase, StaticChainReader>,
    pub jobs: JobPostingApi<SqliteDatabase>,
    pub admin_wallet: String,
    pub fee: Wei,
}

impl LedgerWorld {
    pub fn system(&self) -> &MarketplaceSystem {
        self.system.as_ref().expect("Marketplace not initialised")
    }

    pub fn payment(&self) -> &Payment {
        self.payment.as_ref().expect("No payment has been verified yet")
    }

    pub fn record<T>(&mut self, result: Result<T, ErrorKind>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(kind) => {
                debug!("🥒️ Request failed with {kind}");
                self.last_error = Some(kind);
                None
            },
        }
    }
}

impl MarketplaceSystem {
    pub async fn new(chain: StaticChainReader, admin_wallet: String, fee: Wei) -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let ledger = PaymentLedgerApi::new(db.clone(), chain, "testnet", EventProducers::default());
        let jobs = JobPostingApi::new(db.clone(), EventProducers::default());
        Self { db_path: url, db, ledger, jobs, admin_wallet, fee }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
