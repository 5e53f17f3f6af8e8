//! Matching inbound payment events to pending signups.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::account::{AccountStatus, CreationOutcome, CreationStatus, PendingAccount, ReferenceId};
use crate::account_creator::AccountCreator;
use crate::amount::{AssetAmount, HiveAmount};
use crate::constants::{unix_millis, DEFAULT_ACCOUNT_CREATION_TIMEOUT};
use crate::error::SignupError;
use crate::ledger::Ledger;

/// A transfer reported by the payment webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub from: String,
    /// `<magnitude> <UNIT>`, e.g. `0.750 HIVE`.
    pub amount: String,
    /// Carries the reference id.
    pub memo: String,
}

/// Why an event did not settle a signup. None of these are failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Memo matches no signup.
    UnknownReference,
    /// Signup was already paid, e.g. a webhook replay.
    AlreadySettled,
    /// Free signups are not settled by payment.
    NotPayable,
    WrongAsset { symbol: String },
    /// Not accumulated: a later top-up is compared on its own.
    Underpaid { received: HiveAmount, owed: HiveAmount },
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::UnknownReference => "unknown_reference",
            IgnoreReason::AlreadySettled => "already_settled",
            IgnoreReason::NotPayable => "not_payable",
            IgnoreReason::WrongAsset { .. } => "wrong_asset",
            IgnoreReason::Underpaid { .. } => "underpaid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// This event flipped the signup to paid; `creation` is the downstream result.
    Accepted {
        account: PendingAccount,
        creation: CreationOutcome,
    },
    Ignored(IgnoreReason),
}

impl Reconciliation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reconciliation::Accepted { .. } => "accepted",
            Reconciliation::Ignored(reason) => reason.as_str(),
        }
    }
}

pub struct Reconciler<A> {
    ledger: Arc<dyn Ledger>,
    creator: A,
    creation_timeout: Duration,
}

impl<A: AccountCreator> Reconciler<A> {
    pub fn new(ledger: Arc<dyn Ledger>, creator: A) -> Self {
        Self {
            ledger,
            creator,
            creation_timeout: DEFAULT_ACCOUNT_CREATION_TIMEOUT,
        }
    }

    /// Upper bound on one account-creation call. A pending attempt older than
    /// twice this is treated as abandoned and may be retried.
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = timeout;
        self
    }

    /// Apply one payment event.
    ///
    /// Only a malformed amount or a ledger failure is an error. Exactly one
    /// event per signup can ever be `Accepted`, so account creation is
    /// triggered at most once per signup from this path.
    pub async fn reconcile(&self, event: &PaymentEvent) -> Result<Reconciliation, SignupError> {
        let paid: AssetAmount = event.amount.parse()?;
        let reference_id = ReferenceId::from(event.memo.as_str());

        let account = match self.ledger.find_by_reference_id(&reference_id) {
            Ok(account) => account,
            Err(e) if e.is_not_found() => {
                tracing::debug!(memo = %event.memo, from = %event.from, "payment memo matches no signup");
                return Ok(Reconciliation::Ignored(IgnoreReason::UnknownReference));
            }
            Err(e) => return Err(e),
        };

        if account.status == AccountStatus::Paid {
            tracing::info!(reference_id = %reference_id, "payment for settled signup ignored");
            return Ok(Reconciliation::Ignored(IgnoreReason::AlreadySettled));
        }

        let Some(terms) = account.terms.paid() else {
            return Ok(Reconciliation::Ignored(IgnoreReason::NotPayable));
        };

        if !paid.is_hive() {
            tracing::warn!(
                reference_id = %reference_id,
                symbol = %paid.symbol,
                "payment in unexpected asset ignored"
            );
            return Ok(Reconciliation::Ignored(IgnoreReason::WrongAsset {
                symbol: paid.symbol,
            }));
        }

        if paid.amount < terms.payment_amount_hive {
            tracing::info!(
                reference_id = %reference_id,
                received = %paid.amount,
                owed = %terms.payment_amount_hive,
                "underpayment left pending"
            );
            return Ok(Reconciliation::Ignored(IgnoreReason::Underpaid {
                received: paid.amount,
                owed: terms.payment_amount_hive,
            }));
        }

        // A concurrent delivery may have won between the read and here.
        let account = match self.ledger.mark_paid(&reference_id) {
            Ok(account) => account,
            Err(e) if e.is_not_found() => {
                return Ok(Reconciliation::Ignored(IgnoreReason::AlreadySettled))
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            reference_id = %reference_id,
            username = %account.username,
            from = %event.from,
            amount = %paid.amount,
            "signup paid"
        );

        let creation = self.fulfil(&account).await;
        Ok(Reconciliation::Accepted { account, creation })
    }

    /// Re-run account creation for a paid signup whose last attempt failed
    /// or was abandoned. Returns the record with its updated creation status.
    ///
    /// Fails with `CreationInProgress` while an earlier attempt may still be
    /// running, so a signup never has two creation calls in flight.
    pub async fn retry_creation(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError> {
        let account = self.ledger.find_by_reference_id(id)?;
        if account.status != AccountStatus::Paid {
            return Err(SignupError::NotFound(format!("signup {id} is not paid")));
        }
        if account.creation_status == Some(CreationStatus::Created) {
            tracing::info!(reference_id = %id, "account already created, retry skipped");
            return Ok(account);
        }

        let window = self.creation_timeout.saturating_mul(2).as_millis() as i64;
        let stale_before = unix_millis().saturating_sub(window);
        let Some(claimed) = self.ledger.claim_creation_retry(id, stale_before)? else {
            let current = self.ledger.find_by_reference_id(id)?;
            if current.creation_status == Some(CreationStatus::Created) {
                return Ok(current);
            }
            return Err(SignupError::CreationInProgress(format!(
                "signup {id} has an account-creation attempt in flight"
            )));
        };

        tracing::info!(
            reference_id = %id,
            previous = account.creation_status.map(|s| s.as_str()),
            "retrying account creation"
        );
        self.fulfil(&claimed).await;
        self.ledger.find_by_reference_id(id)
    }

    async fn fulfil(&self, account: &PendingAccount) -> CreationOutcome {
        let outcome = match self
            .creator
            .create_account(&account.reference_id, &account.username)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    reference_id = %account.reference_id,
                    username = %account.username,
                    "account created"
                );
                CreationOutcome::Created
            }
            Err(e) => {
                tracing::error!(
                    reference_id = %account.reference_id,
                    username = %account.username,
                    error = %e,
                    "account creation failed after payment was accepted"
                );
                CreationOutcome::Failed(e.to_string())
            }
        };

        if let Err(e) = self.ledger.record_creation(&account.reference_id, &outcome) {
            tracing::error!(
                reference_id = %account.reference_id,
                outcome = outcome.status().as_str(),
                error = %e,
                "failed to record account creation outcome"
            );
        }

        outcome
    }
}
