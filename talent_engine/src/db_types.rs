use std::{collections::HashMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::Type;
pub use talent_common::Wei;
use thiserror::Error;

static TX_REF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("Invalid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("'{0}' is not a valid transaction reference. Expected 0x followed by 64 hex digits")]
    InvalidTxRef(String),
    #[error("Invalid {kind} value: '{value}'")]
    InvalidEnumValue { kind: &'static str, value: String },
    #[error("Invalid consuming action: '{0}'")]
    InvalidConsumingAction(String),
}

//--------------------------------------     Identifiers     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(i64);

impl PaymentId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for PaymentId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a recruiter or job seeker, as issued by the user store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&String> for UserId {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------        TxRef        ---------------------------------------------------------
/// A transaction hash on the configured network. Always held in lowercase, so that the same transfer submitted with
/// different casing maps onto the same ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxRef(String);

impl TxRef {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for TxRef {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if TX_REF_PATTERN.is_match(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ConversionError::InvalidTxRef(s.to_string()))
        }
    }
}

impl TryFrom<String> for TxRef {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxRef> for String {
    fn from(value: TxRef) -> Self {
        value.0
    }
}

impl Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Submitted, but not yet checked against the chain.
    Pending,
    /// The on-chain transfer satisfied recipient, amount and confirmation checks.
    Verified,
    /// The on-chain transfer was checked and rejected.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Verified => write!(f, "Verified"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Verified" => Ok(Self::Verified),
            "Failed" => Ok(Self::Failed),
            _ => Err(ConversionError::InvalidEnumValue { kind: "payment status", value: s.to_string() }),
        }
    }
}

//--------------------------------------   PaymentPurpose    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPurpose {
    /// Pays the platform fee for one job posting.
    JobPosting,
    /// Upgrades a job seeker's account to premium.
    JobSeekerPremium,
}

impl PaymentPurpose {
    /// The only payer role allowed to claim a payment of this purpose.
    pub fn payer_role(&self) -> PayerRole {
        match self {
            PaymentPurpose::JobPosting => PayerRole::Recruiter,
            PaymentPurpose::JobSeekerPremium => PayerRole::JobSeeker,
        }
    }
}

impl Display for PaymentPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentPurpose::JobPosting => write!(f, "JobPosting"),
            PaymentPurpose::JobSeekerPremium => write!(f, "JobSeekerPremium"),
        }
    }
}

impl FromStr for PaymentPurpose {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JobPosting" => Ok(Self::JobPosting),
            "JobSeekerPremium" => Ok(Self::JobSeekerPremium),
            _ => Err(ConversionError::InvalidEnumValue { kind: "payment purpose", value: s.to_string() }),
        }
    }
}

//--------------------------------------        Payer        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayerRole {
    Recruiter,
    JobSeeker,
}

impl Display for PayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayerRole::Recruiter => write!(f, "Recruiter"),
            PayerRole::JobSeeker => write!(f, "JobSeeker"),
        }
    }
}

impl FromStr for PayerRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Recruiter" => Ok(Self::Recruiter),
            "JobSeeker" => Ok(Self::JobSeeker),
            _ => Err(ConversionError::InvalidEnumValue { kind: "payer role", value: s.to_string() }),
        }
    }
}

/// The user a payment is attributed to. A payment has at most one payer, in exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub id: UserId,
    pub role: PayerRole,
}

impl Payer {
    pub fn recruiter<S: Into<UserId>>(id: S) -> Self {
        Self { id: id.into(), role: PayerRole::Recruiter }
    }

    pub fn job_seeker<S: Into<UserId>>(id: S) -> Self {
        Self { id: id.into(), role: PayerRole::JobSeeker }
    }
}

impl Display for Payer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}

//--------------------------------------  ConsumingAction    ---------------------------------------------------------
/// The single action a payment was spent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumingAction {
    JobPosting(JobId),
    PremiumUpgrade(UserId),
}

impl ConsumingAction {
    /// The only payment purpose that can pay for this action.
    pub fn purpose(&self) -> PaymentPurpose {
        match self {
            ConsumingAction::JobPosting(_) => PaymentPurpose::JobPosting,
            ConsumingAction::PremiumUpgrade(_) => PaymentPurpose::JobSeekerPremium,
        }
    }
}

impl Display for ConsumingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumingAction::JobPosting(id) => write!(f, "job:{id}"),
            ConsumingAction::PremiumUpgrade(user) => write!(f, "premium:{user}"),
        }
    }
}

impl FromStr for ConsumingAction {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ConversionError::InvalidConsumingAction(s.to_string());
        match s.split_once(':') {
            Some(("job", id)) => id.parse::<i64>().map(|id| Self::JobPosting(JobId::from(id))).map_err(|_| err()),
            Some(("premium", user)) if !user.is_empty() => Ok(Self::PremiumUpgrade(UserId::from(user))),
            _ => Err(err()),
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// A transfer that has passed on-chain verification and is ready to be stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub tx_ref: TxRef,
    pub amount: Wei,
    pub recipient: String,
    pub network: String,
    pub purpose: PaymentPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub tx_ref: TxRef,
    pub amount: Wei,
    pub recipient: String,
    pub network: String,
    pub status: PaymentStatus,
    pub purpose: PaymentPurpose,
    pub payer: Option<Payer>,
    pub consumed: bool,
    pub consumed_by: Option<ConsumingAction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.payer.as_ref().map(|p| &p.id == user).unwrap_or(false)
    }
}

//--------------------------------------         Job         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub budget: Option<String>,
}

impl NewJob {
    pub fn new<T: Into<String>, D: Into<String>>(title: T, description: D) -> Self {
        Self { title: title.into(), description: description.into(), ..Default::default() }
    }

    pub fn with_skills<S: Into<String>>(mut self, skills: impl IntoIterator<Item = S>) -> Self {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub recruiter_id: UserId,
    pub payment_id: PaymentId,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub budget: Option<String>,
    /// Cached fitment scores, keyed by candidate.
    pub match_scores: HashMap<UserId, f64>,
    /// Job seekers who applied, in application order.
    pub candidates: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  CandidateProfile   ---------------------------------------------------------
/// The parts of a job seeker's profile used for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub bio: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub is_premium: bool,
}

impl CandidateProfile {
    pub fn new<I: Into<UserId>, N: Into<String>>(id: I, name: N) -> Self {
        Self { id: id.into(), name: name.into(), ..Default::default() }
    }

    pub fn with_bio<S: Into<String>>(mut self, bio: S) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_summary<S: Into<String>>(mut self, summary: S) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_skills<S: Into<String>>(mut self, skills: impl IntoIterator<Item = S>) -> Self {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }

    /// The text submitted to the scoring capability: the summary if present, otherwise the bio, otherwise the name.
    /// Returns `None` if all three are blank, in which case the candidate is not ranked.
    pub fn scoring_text(&self) -> Option<&str> {
        [self.summary.as_str(), self.bio.as_str(), self.name.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}
