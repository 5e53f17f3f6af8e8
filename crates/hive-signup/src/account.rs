//! Pending account records and their state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::amount::{HiveAmount, UsdAmount};
use crate::error::SignupError;

/// Opaque id correlating a signup request with its payment memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Fresh id from a random UUIDv4 (122 random bits), hex without dashes.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReferenceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReferenceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Free,
    Paid,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Free => "free",
            AccountType::Paid => "paid",
        }
    }
}

impl FromStr for AccountType {
    type Err = SignupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(AccountType::Free),
            "paid" => Ok(AccountType::Paid),
            other => Err(SignupError::Internal(format!("unknown account type '{other}'"))),
        }
    }
}

/// Monotonic: `Pending -> Paid`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Paid,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Paid => "paid",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = SignupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "paid" => Ok(AccountStatus::Paid),
            other => Err(SignupError::Internal(format!("unknown account status '{other}'"))),
        }
    }
}

/// Progress of the downstream account creation after payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationStatus {
    /// Payment committed; creation not yet confirmed.
    Pending,
    Created,
    Failed,
}

impl CreationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CreationStatus::Pending => "pending",
            CreationStatus::Created => "created",
            CreationStatus::Failed => "failed",
        }
    }
}

impl FromStr for CreationStatus {
    type Err = SignupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CreationStatus::Pending),
            "created" => Ok(CreationStatus::Created),
            "failed" => Ok(CreationStatus::Failed),
            other => Err(SignupError::Internal(format!("unknown creation status '{other}'"))),
        }
    }
}

/// Amounts frozen into a paid record at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidTerms {
    pub payment_amount_usd: UsdAmount,
    pub payment_amount_hive: HiveAmount,
    pub hive_price_snapshot: f64,
}

/// Type-specific fields. A free record never carries payment fields and a
/// paid record always carries all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "accountType", rename_all = "lowercase")]
pub enum AccountTerms {
    #[serde(rename_all = "camelCase")]
    Free { verification_code: String },
    Paid(PaidTerms),
}

impl AccountTerms {
    pub fn account_type(&self) -> AccountType {
        match self {
            AccountTerms::Free { .. } => AccountType::Free,
            AccountTerms::Paid(_) => AccountType::Paid,
        }
    }

    pub fn paid(&self) -> Option<&PaidTerms> {
        match self {
            AccountTerms::Paid(terms) => Some(terms),
            AccountTerms::Free { .. } => None,
        }
    }
}

/// One provisioning attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAccount {
    pub reference_id: ReferenceId,
    pub username: String,
    #[serde(flatten)]
    pub terms: AccountTerms,
    pub status: AccountStatus,
    /// Unix ms.
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    /// Unix ms when the latest account-creation attempt was claimed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_attempted_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_status: Option<CreationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_error: Option<String>,
}

impl PendingAccount {
    pub fn new(reference_id: ReferenceId, username: String, terms: AccountTerms, created_at: i64) -> Self {
        Self {
            reference_id,
            username,
            terms,
            status: AccountStatus::Pending,
            created_at,
            paid_at: None,
            creation_attempted_at: None,
            creation_status: None,
            creation_error: None,
        }
    }

    pub fn account_type(&self) -> AccountType {
        self.terms.account_type()
    }

    pub fn is_pending(&self) -> bool {
        self.status == AccountStatus::Pending
    }
}

/// Result of one downstream account-creation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationOutcome {
    Created,
    Failed(String),
}

impl CreationOutcome {
    pub fn status(&self) -> CreationStatus {
        match self {
            CreationOutcome::Created => CreationStatus::Created,
            CreationOutcome::Failed(_) => CreationStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CreationOutcome::Created => None,
            CreationOutcome::Failed(e) => Some(e),
        }
    }
}
