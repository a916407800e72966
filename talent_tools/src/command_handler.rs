use anyhow::{anyhow, Context, Result};
use log::*;
use serde::Serialize;
use talent_engine::{
    db_types::{CandidateProfile, JobId, NewJob, PaymentId, UserId},
    events::EventProducers,
    scoring::ScoringClient,
    start_write_back_worker,
    traits::{CandidatePool, PaymentQueryFilter},
    EngineConfig,
    HttpScoringClient,
    JobPostingApi,
    JsonRpcChainReader,
    MatchScoreCache,
    PaymentLedgerApi,
    RankingApi,
    RankingOptions,
    SqliteDatabase,
    WriteBackQueue,
};
use tokio::task::JoinHandle;

use crate::{
    formatting::{format_job, format_payment, format_payments, format_ranking, format_skills, format_supply},
    PaymentsParams,
    PostJobParams,
    SeekerParams,
    VerifyParams,
};

/// Prints `value` as pretty JSON, or through `table` otherwise.
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, table: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", table(value));
    }
    Ok(())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// A ranking API together with its write-back worker. [`Self::finish`] must be called before exiting, or scores
/// computed by the session may be lost.
struct RankingSession {
    api: RankingApi<SqliteDatabase, HttpScoringClient>,
    queue: WriteBackQueue,
    worker: JoinHandle<()>,
}

impl RankingSession {
    async fn finish(self) {
        let Self { api, queue, worker } = self;
        if !queue.flush().await {
            warn!("💾 The write-back worker stopped early. Some new scores were not saved");
        }
        // The worker exits once every queue handle is gone
        drop(api);
        drop(queue);
        if let Err(e) = worker.await {
            warn!("💾 Write-back worker did not shut down cleanly. {e}");
        }
    }
}

pub struct Marketplace {
    config: EngineConfig,
    db: SqliteDatabase,
}

impl Marketplace {
    /// Loads configuration from the environment and connects to the database. With `create`, a missing database is
    /// created first.
    pub async fn connect(create: bool) -> Result<Self> {
        let config = EngineConfig::from_env_or_default();
        if create && SqliteDatabase::create_if_missing(&config.database_url).await? {
            println!("Created {}", config.database_url);
        }
        let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
            .await
            .with_context(|| format!("Could not connect to {}", config.database_url))?;
        Ok(Self { config, db })
    }

    pub async fn close(mut self) {
        if let Err(e) = self.db.close().await {
            warn!("🗃️ Error closing the database. {e}");
        }
    }

    fn ledger(&self) -> Result<PaymentLedgerApi<SqliteDatabase, JsonRpcChainReader>> {
        let chain = &self.config.chain;
        let reader = JsonRpcChainReader::new(chain.rpc_timeout)?;
        let ledger = PaymentLedgerApi::new(self.db.clone(), reader, chain.network.clone(), EventProducers::default())
            .with_rpc_timeout(chain.rpc_timeout);
        Ok(ledger)
    }

    fn scorer(&self) -> Result<HttpScoringClient> {
        let scoring = &self.config.scoring;
        Ok(HttpScoringClient::new(&scoring.base_url, scoring.timeout)?)
    }

    fn ranking(&self) -> Result<RankingSession> {
        let scoring = &self.config.scoring;
        let cache = MatchScoreCache::new(self.db.clone());
        let (queue, worker) = start_write_back_worker(cache, scoring.write_back_queue);
        let api = RankingApi::new(self.db.clone(), self.scorer()?, queue.clone(), RankingOptions::from(scoring));
        Ok(RankingSession { api, queue, worker })
    }

    pub async fn migrate(&self) -> Result<()> {
        self.db.run_migrations().await?;
        println!("{} is up to date", self.db.url());
        Ok(())
    }

    pub async fn verify(&self, params: VerifyParams, json: bool) -> Result<()> {
        let chain = &self.config.chain;
        let rpc = chain.rpc_url.reveal();
        if rpc.is_empty() {
            return Err(anyhow!("TALENT_CHAIN_RPC_URL must be set to verify payments"));
        }
        let ledger = self.ledger()?;
        let payment = match params.premium_for {
            Some(seeker) => {
                let seeker = UserId::from(seeker);
                let payment = ledger
                    .upgrade_to_premium(rpc, &chain.admin_wallet, &params.tx_ref, chain.platform_fee, &seeker)
                    .await
                    .map_err(|e| anyhow!("{e} ({})", e.kind()))?;
                self.grant_premium(&seeker).await?;
                payment
            },
            None => ledger
                .verify_and_store(rpc, &chain.admin_wallet, &params.tx_ref, chain.platform_fee)
                .await
                .map_err(|e| anyhow!("{e} ({})", e.kind()))?,
        };
        emit(json, &payment, format_payment)
    }

    /// Flags the seeker as premium in the local candidate pool, if they are in it.
    async fn grant_premium(&self, seeker: &UserId) -> Result<()> {
        let pool = self.db.fetch_seekers().await?;
        match pool.into_iter().find(|p| &p.id == seeker) {
            Some(profile) => {
                self.db.upsert_seeker(profile.premium()).await?;
                info!("🚀️ {seeker} is now a premium job seeker");
            },
            None => warn!("🚀️ {seeker} is not in the candidate pool. Premium must be granted by the user store"),
        }
        Ok(())
    }

    pub async fn payments(&self, params: PaymentsParams, json: bool) -> Result<()> {
        let mut filter = PaymentQueryFilter::default();
        if let Some(payer) = params.payer {
            filter = filter.with_payer(payer);
        }
        if let Some(purpose) = params.purpose {
            filter = filter.with_purpose(purpose);
        }
        if params.unspent {
            filter = filter.with_consumed(false);
        }
        let payments = self.ledger()?.list(filter).await?;
        emit(json, payments.as_slice(), format_payments)
    }

    pub async fn post_job(&self, params: PostJobParams, json: bool) -> Result<()> {
        let jobs = JobPostingApi::new(self.db.clone(), EventProducers::default());
        let mut job = NewJob::new(params.title, params.description).with_skills(clean_list(params.skills));
        if let Some(location) = params.location {
            job = job.with_location(location);
        }
        let recruiter = UserId::from(params.recruiter);
        let job = jobs
            .create_job(&recruiter, job, PaymentId::from(params.payment), self.config.chain.platform_fee)
            .await
            .map_err(|e| anyhow!("{e} ({})", e.kind()))?;
        emit(json, &job, format_job)
    }

    pub async fn upsert_seeker(&self, params: SeekerParams) -> Result<()> {
        let mut profile = CandidateProfile::new(params.id, params.name)
            .with_summary(params.summary)
            .with_bio(params.bio)
            .with_skills(clean_list(params.skills));
        profile.email = params.email;
        if params.premium {
            profile = profile.premium();
        }
        let about = [profile.summary.trim(), profile.bio.trim()].into_iter().find(|s| !s.is_empty()).map(String::from);
        if let (true, Some(text)) = (profile.skills.is_empty(), about) {
            match self.scorer()?.extract_skills(&text).await {
                Ok(skills) => profile.skills = skills,
                Err(e) => warn!("🧮 Could not extract skills for {}. {e}", profile.id),
            }
        }
        let summary = format!("{} ({}) with skills [{}]", profile.name, profile.id, profile.skills.join(", "));
        self.db.upsert_seeker(profile).await?;
        println!("Saved {summary}");
        Ok(())
    }

    pub async fn apply(&self, job_id: JobId, seeker: UserId) -> Result<()> {
        let jobs = JobPostingApi::new(self.db.clone(), EventProducers::default());
        let job = jobs.apply(job_id, &seeker).await.map_err(|e| anyhow!("{e} ({})", e.kind()))?;
        println!("{seeker} applied to job #{job_id}. {} applications so far", job.candidates.len());
        Ok(())
    }

    pub async fn rank(&self, job_id: JobId, recruiter: UserId, json: bool) -> Result<()> {
        let session = self.ranking()?;
        let ranking = session.api.rank(job_id, &recruiter).await;
        session.finish().await;
        let ranking = ranking.map_err(|e| anyhow!("{e} ({})", e.kind()))?;
        emit(json, &ranking, format_ranking)
    }

    pub async fn supply(&self, recruiter: UserId, threshold: Option<f64>, json: bool) -> Result<()> {
        let threshold = threshold.unwrap_or(self.config.scoring.match_threshold);
        if !threshold.is_finite() {
            return Err(anyhow!("The match threshold must be a finite number, not {threshold}"));
        }
        let session = self.ranking()?;
        let supply = session.api.match_supply(&recruiter, threshold).await;
        session.finish().await;
        let supply = supply.map_err(|e| anyhow!("{e} ({})", e.kind()))?;
        emit(json, supply.as_slice(), |s| format_supply(s, threshold))
    }

    pub async fn skills(&self, limit: usize, json: bool) -> Result<()> {
        let session = self.ranking()?;
        let skills = session.api.skill_frequencies(limit).await;
        session.finish().await;
        let skills = skills.map_err(|e| anyhow!("{e} ({})", e.kind()))?;
        emit(json, skills.as_slice(), format_skills)
    }
}
