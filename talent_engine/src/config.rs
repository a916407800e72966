//! Engine configuration, read from `TALENT_*` environment variables.
//!
//! Missing or invalid values never abort start-up. Each one is logged and replaced by its default, except for the
//! RPC URL and the platform wallet, which have no sensible default and are left empty (with an error logged).
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use talent_common::{Secret, Wei};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/talent.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_NETWORK: &str = "sepolia";
const DEFAULT_PLATFORM_FEE: &str = "0.1";
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_SCORING_URL: &str = "http://localhost:8000";
const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SCORING_CONCURRENCY: usize = 8;
const DEFAULT_WRITE_BACK_QUEUE: usize = 256;
const DEFAULT_MATCH_THRESHOLD: f64 = 50.0;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub chain: ChainConfig,
    pub scoring: ScoringConfig,
}

#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// The JSON-RPC endpoint. Hosted endpoints usually embed an API key, hence the secret.
    pub rpc_url: Secret<String>,
    /// The platform wallet that fees must be paid to.
    pub admin_wallet: String,
    /// Network identifier stored with each payment.
    pub network: String,
    /// The minimum accepted payment.
    pub platform_fee: Wei,
    /// Upper bound on one verification (both RPC calls).
    pub rpc_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ScoringConfig {
    pub base_url: String,
    /// Upper bound on one scoring call.
    pub timeout: Duration,
    /// Maximum number of scoring calls in flight for one ranking.
    pub max_concurrent: usize,
    /// Capacity of the score write-back queue.
    pub write_back_queue: usize,
    /// Minimum score counted by the match-supply summary.
    pub match_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            chain: ChainConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: Secret::default(),
            admin_wallet: String::default(),
            network: DEFAULT_NETWORK.to_string(),
            platform_fee: default_platform_fee(),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCORING_URL.to_string(),
            timeout: DEFAULT_SCORING_TIMEOUT,
            max_concurrent: DEFAULT_SCORING_CONCURRENCY,
            write_back_queue: DEFAULT_WRITE_BACK_QUEUE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

fn default_platform_fee() -> Wei {
    // 0.1 in wei
    Wei::from(100_000_000_000_000_000)
}

/// Reads `var` and parses it, falling back to `default` with a warning when it is unset or invalid.
fn parse_var<T>(var: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(var) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {var} is not set. Using the default, {default}.");
            default
        },
    }
}

/// As [`parse_var`], for durations given in whole seconds.
fn parse_seconds(var: &str, default: Duration) -> Duration {
    let secs = parse_var(var, default.as_secs());
    if secs == 0 {
        warn!("🪛️ {var} must be at least one second. Using the default, {}s, instead.", default.as_secs());
        return default;
    }
    Duration::from_secs(secs)
}

/// As [`parse_var`], for score thresholds. Values outside `[0, 100]` are clamped. NaN and infinities fall back to
/// `default`.
fn parse_threshold(var: &str, default: f64) -> f64 {
    let threshold = parse_var(var, default);
    if !threshold.is_finite() {
        warn!("🪛️ {var} must be a finite number. Using the default, {default}, instead.");
        return default;
    }
    threshold.clamp(0.0, 100.0)
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("TALENT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ TALENT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_var("TALENT_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let chain = ChainConfig::from_env_or_default();
        let scoring = ScoringConfig::from_env_or_default();
        Self { database_url, max_connections, chain, scoring }
    }
}

impl ChainConfig {
    pub fn from_env_or_default() -> Self {
        let rpc_url = env::var("TALENT_CHAIN_RPC_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TALENT_CHAIN_RPC_URL is not set. Payments cannot be verified until it is.");
            String::default()
        });
        let admin_wallet = env::var("TALENT_ADMIN_WALLET").ok().unwrap_or_else(|| {
            error!("🪛️ TALENT_ADMIN_WALLET is not set. Every payment will fail verification until it is.");
            String::default()
        });
        let network = env::var("TALENT_NETWORK").ok().unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let platform_fee = env::var("TALENT_PLATFORM_FEE")
            .ok()
            .map(|s| {
                Wei::from_ether_str(&s).unwrap_or_else(|e| {
                    warn!("🪛️ Invalid TALENT_PLATFORM_FEE. {e}. Using the default, {DEFAULT_PLATFORM_FEE}, instead.");
                    default_platform_fee()
                })
            })
            .unwrap_or_else(default_platform_fee);
        let rpc_timeout = parse_seconds("TALENT_RPC_TIMEOUT", DEFAULT_RPC_TIMEOUT);
        info!("🪛️ Verifying payments of at least {platform_fee} to {admin_wallet} on {network}");
        Self { rpc_url: Secret::new(rpc_url), admin_wallet, network, platform_fee, rpc_timeout }
    }
}

impl ScoringConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("TALENT_SCORING_URL").ok().unwrap_or_else(|| {
            info!("🪛️ TALENT_SCORING_URL is not set. Using the default, {DEFAULT_SCORING_URL}.");
            DEFAULT_SCORING_URL.to_string()
        });
        let timeout = parse_seconds("TALENT_SCORING_TIMEOUT", DEFAULT_SCORING_TIMEOUT);
        let max_concurrent = parse_var("TALENT_SCORING_CONCURRENCY", DEFAULT_SCORING_CONCURRENCY).max(1);
        let write_back_queue = parse_var("TALENT_WRITE_BACK_QUEUE", DEFAULT_WRITE_BACK_QUEUE).max(1);
        let match_threshold = parse_threshold("TALENT_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD);
        Self { base_url, timeout, max_concurrent, write_back_queue, match_threshold }
    }
}
