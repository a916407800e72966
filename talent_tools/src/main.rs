use std::env;

use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::info;
use talent_common::helpers::parse_boolean_flag;
use talent_engine::{
    db_types::{JobId, PaymentPurpose},
    DEFAULT_SKILL_LIMIT,
};

mod command_handler;
mod formatting;

use command_handler::Marketplace;

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Operator tools for the talent marketplace engine")]
pub struct Arguments {
    /// Print results as JSON instead of tables. Also enabled by TALENTCTL_JSON=1
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database if necessary and bring its schema up to date
    Migrate,
    /// Verify a transaction on chain and record it as a payment
    Verify(VerifyParams),
    /// List recorded payments
    Payments(PaymentsParams),
    /// Post a job, spending a verified job posting payment as the fee
    #[clap(name = "post-job")]
    PostJob(PostJobParams),
    /// Add or replace a job seeker in the candidate pool
    Seeker(SeekerParams),
    /// Apply to a job on behalf of a job seeker
    Apply {
        #[arg(required = true, index = 1)]
        job: i64,
        #[arg(required = true, index = 2)]
        seeker: String,
    },
    /// Rank the candidate pool against a job
    Rank {
        #[arg(required = true, index = 1)]
        job: i64,
        /// The recruiter who owns the job
        #[arg(required = true, index = 2)]
        recruiter: String,
    },
    /// Count strong matches for each of a recruiter's jobs
    Supply {
        #[arg(required = true, index = 1)]
        recruiter: String,
        /// Minimum score that counts as a match. Defaults to TALENT_MATCH_THRESHOLD
        #[arg(short = 't', long = "threshold")]
        threshold: Option<f64>,
    },
    /// The most common skills across the job seeker pool
    Skills {
        /// How many skills to list
        #[arg(short = 'n', long = "limit", default_value_t = DEFAULT_SKILL_LIMIT)]
        limit: usize,
    },
}

#[derive(Debug, Args)]
pub struct VerifyParams {
    /// The transaction hash (0x followed by 64 hex digits)
    #[arg(required = true, index = 1)]
    tx_ref: String,
    /// Treat the transfer as a premium upgrade fee and grant premium to this job seeker
    #[arg(short = 'p', long = "premium")]
    premium_for: Option<String>,
}

#[derive(Debug, Args)]
pub struct PaymentsParams {
    /// Only payments attached to this user
    #[arg(short = 'u', long = "payer")]
    payer: Option<String>,
    /// Only payments for this purpose (JobPosting, JobSeekerPremium)
    #[arg(short = 'p', long = "purpose")]
    purpose: Option<PaymentPurpose>,
    /// Only payments that have not been spent yet
    #[arg(long = "unspent")]
    unspent: bool,
}

#[derive(Debug, Args)]
pub struct PostJobParams {
    /// The recruiter posting the job
    #[arg(required = true, index = 1)]
    recruiter: String,
    /// The id of the payment that pays the posting fee
    #[arg(required = true, index = 2)]
    payment: i64,
    #[arg(short = 't', long = "title")]
    title: String,
    #[arg(short = 'd', long = "description", default_value = "")]
    description: String,
    /// Required skills, comma separated
    #[arg(short = 's', long = "skills", value_delimiter = ',')]
    skills: Vec<String>,
    #[arg(short = 'l', long = "location")]
    location: Option<String>,
}

#[derive(Debug, Args)]
pub struct SeekerParams {
    #[arg(required = true, index = 1)]
    id: String,
    #[arg(required = true, index = 2)]
    name: String,
    #[arg(long = "email")]
    email: Option<String>,
    #[arg(long = "summary", default_value = "")]
    summary: String,
    #[arg(long = "bio", default_value = "")]
    bio: String,
    /// Skills, comma separated. If omitted, they are extracted from the summary or bio by the scoring service
    #[arg(short = 's', long = "skills", value_delimiter = ',')]
    skills: Vec<String>,
    #[arg(long = "premium")]
    premium: bool,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let json = cli.json || parse_boolean_flag(env::var("TALENTCTL_JSON").ok(), false);
    let market = match Marketplace::connect(matches!(cli.command, Command::Migrate)).await {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Could not open the marketplace database. {e:#}");
            std::process::exit(1);
        },
    };
    let result = match cli.command {
        Command::Migrate => market.migrate().await,
        Command::Verify(params) => market.verify(params, json).await,
        Command::Payments(params) => market.payments(params, json).await,
        Command::PostJob(params) => market.post_job(params, json).await,
        Command::Seeker(params) => market.upsert_seeker(params).await,
        Command::Apply { job, seeker } => market.apply(JobId::from(job), seeker.into()).await,
        Command::Rank { job, recruiter } => market.rank(JobId::from(job), recruiter.into(), json).await,
        Command::Supply { recruiter, threshold } => market.supply(recruiter.into(), threshold, json).await,
        Command::Skills { limit } => market.skills(limit, json).await,
    };
    market.close().await;
    match result {
        Ok(()) => info!("🚀️ Done"),
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        },
    }
}
