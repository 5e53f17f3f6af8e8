//! Durable store of pending and paid signup records.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Mutex;

use crate::account::{
    AccountStatus, AccountTerms, AccountType, CreationOutcome, CreationStatus, PaidTerms,
    PendingAccount, ReferenceId,
};
use crate::amount::{HiveAmount, UsdAmount};
use crate::constants::unix_millis;
use crate::error::SignupError;

/// Record store for signup attempts.
///
/// Implementations must be thread-safe (`Send + Sync`). `mark_paid` is the one
/// concurrency-sensitive primitive: for a given reference id exactly one caller
/// may ever observe success.
pub trait Ledger: Send + Sync {
    /// Insert a new record. Fails with `DuplicateUsername` if the username
    /// exists in any status.
    fn create(&self, account: &PendingAccount) -> Result<(), SignupError>;

    fn find_by_reference_id(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError>;

    /// Like [`Ledger::find_by_reference_id`] but only matches `pending` records.
    fn find_pending_by_reference_id(&self, id: &ReferenceId)
        -> Result<PendingAccount, SignupError>;

    /// Atomically flip `pending -> paid` and return the updated record.
    /// Fails with `NotFound` when no pending record has this id.
    fn mark_paid(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError>;

    /// Claim a paid record for another account-creation attempt.
    ///
    /// Succeeds only when the last attempt failed, or when it is still marked
    /// pending but was claimed before `stale_before` (Unix ms), e.g. after a
    /// crash. Returns `None` when the record is not claimable, so concurrent
    /// callers get at most one claim per attempt.
    fn claim_creation_retry(
        &self,
        id: &ReferenceId,
        stale_before: i64,
    ) -> Result<Option<PendingAccount>, SignupError>;

    /// Record the result of a downstream account-creation attempt on a paid record.
    fn record_creation(
        &self,
        id: &ReferenceId,
        outcome: &CreationOutcome,
    ) -> Result<(), SignupError>;

    /// Records in `status`, newest first.
    fn list_by_status(
        &self,
        status: AccountStatus,
        limit: u32,
    ) -> Result<Vec<PendingAccount>, SignupError>;

    /// Paid records whose account has not been confirmed created, oldest first.
    fn list_unfulfilled(&self, limit: u32) -> Result<Vec<PendingAccount>, SignupError>;
}

fn not_found(id: &ReferenceId) -> SignupError {
    SignupError::NotFound(format!("no signup with reference id {id}"))
}

fn not_pending(id: &ReferenceId) -> SignupError {
    SignupError::NotFound(format!("no pending signup with reference id {id}"))
}

fn retry_claimable(record: &PendingAccount, stale_before: i64) -> bool {
    if record.status != AccountStatus::Paid {
        return false;
    }
    match record.creation_status {
        None | Some(CreationStatus::Failed) => true,
        Some(CreationStatus::Pending) => match record.creation_attempted_at {
            Some(at) => at < stale_before,
            None => true,
        },
        Some(CreationStatus::Created) => false,
    }
}

/// In-memory ledger backed by DashMap. Lost on restart.
pub struct InMemoryLedger {
    records: DashMap<ReferenceId, PendingAccount>,
    /// username -> reference id, enforces username uniqueness.
    usernames: DashMap<String, ReferenceId>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            usernames: DashMap::new(),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for InMemoryLedger {
    fn create(&self, account: &PendingAccount) -> Result<(), SignupError> {
        match self.usernames.entry(account.username.clone()) {
            Entry::Occupied(_) => {
                return Err(SignupError::DuplicateUsername(account.username.clone()))
            }
            Entry::Vacant(v) => {
                v.insert(account.reference_id.clone());
            }
        }

        match self.records.entry(account.reference_id.clone()) {
            Entry::Occupied(_) => {
                self.usernames.remove(&account.username);
                Err(SignupError::Internal(format!(
                    "reference id collision: {}",
                    account.reference_id
                )))
            }
            Entry::Vacant(v) => {
                v.insert(account.clone());
                Ok(())
            }
        }
    }

    fn find_by_reference_id(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError> {
        self.records
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| not_found(id))
    }

    fn find_pending_by_reference_id(
        &self,
        id: &ReferenceId,
    ) -> Result<PendingAccount, SignupError> {
        self.records
            .get(id)
            .filter(|r| r.is_pending())
            .map(|r| r.clone())
            .ok_or_else(|| not_pending(id))
    }

    fn mark_paid(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError> {
        // The shard write lock makes check-and-set atomic.
        let mut record = self.records.get_mut(id).ok_or_else(|| not_pending(id))?;
        if !record.is_pending() {
            return Err(not_pending(id));
        }
        let now = unix_millis();
        record.status = AccountStatus::Paid;
        record.paid_at = Some(now);
        record.creation_status = Some(CreationStatus::Pending);
        record.creation_attempted_at = Some(now);
        Ok(record.clone())
    }

    fn claim_creation_retry(
        &self,
        id: &ReferenceId,
        stale_before: i64,
    ) -> Result<Option<PendingAccount>, SignupError> {
        let mut record = self.records.get_mut(id).ok_or_else(|| not_found(id))?;
        if !retry_claimable(&record, stale_before) {
            return Ok(None);
        }
        record.creation_status = Some(CreationStatus::Pending);
        record.creation_error = None;
        record.creation_attempted_at = Some(unix_millis());
        Ok(Some(record.clone()))
    }

    fn record_creation(
        &self,
        id: &ReferenceId,
        outcome: &CreationOutcome,
    ) -> Result<(), SignupError> {
        let mut record = self.records.get_mut(id).ok_or_else(|| not_found(id))?;
        if record.status != AccountStatus::Paid {
            return Err(SignupError::NotFound(format!(
                "signup {id} is not paid"
            )));
        }
        record.creation_status = Some(outcome.status());
        record.creation_error = outcome.error().map(String::from);
        Ok(())
    }

    fn list_by_status(
        &self,
        status: AccountStatus,
        limit: u32,
    ) -> Result<Vec<PendingAccount>, SignupError> {
        let mut matching: Vec<PendingAccount> = self
            .records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    fn list_unfulfilled(&self, limit: u32) -> Result<Vec<PendingAccount>, SignupError> {
        let mut matching: Vec<PendingAccount> = self
            .records
            .iter()
            .filter(|r| {
                r.status == AccountStatus::Paid
                    && r.creation_status != Some(CreationStatus::Created)
            })
            .map(|r| r.clone())
            .collect();
        matching.sort_by_key(|r| r.paid_at);
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_accounts (
    reference_id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    account_type TEXT NOT NULL,
    status TEXT NOT NULL,
    verification_code TEXT,
    payment_amount_usd_cents INTEGER,
    payment_amount_hive_milli INTEGER,
    hive_price_snapshot REAL,
    created_at INTEGER NOT NULL,
    paid_at INTEGER,
    creation_status TEXT,
    creation_error TEXT,
    creation_attempted_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_pending_accounts_status ON pending_accounts(status);
CREATE INDEX IF NOT EXISTS idx_pending_accounts_created_at ON pending_accounts(created_at);
"#;

const SELECT_COLUMNS: &str = "reference_id, username, account_type, status, verification_code, \
     payment_amount_usd_cents, payment_amount_hive_milli, hive_price_snapshot, created_at, \
     paid_at, creation_status, creation_error, creation_attempted_at";

/// Persistent ledger backed by SQLite. Survives restarts.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    ///
    /// On Unix the file mode is restricted to 0600.
    pub fn open(path: &str) -> Result<Self, SignupError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "failed to set ledger database file permissions to 0600"
                );
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory SQLite database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, SignupError> {
        Self::open(":memory:")
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SignupError> {
        self.conn
            .lock()
            .map_err(|_| SignupError::Internal("ledger lock poisoned".to_string()))
    }

    fn select_one(
        conn: &Connection,
        clause: &str,
        id: &ReferenceId,
    ) -> Result<Option<PendingAccount>, SignupError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM pending_accounts WHERE {clause}");
        let row = conn
            .query_row(&sql, params![id.as_str()], read_row)
            .optional()?;
        row.map(RawAccount::into_account).transpose()
    }

    fn select_many(
        conn: &Connection,
        sql_tail: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<PendingAccount>, SignupError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM pending_accounts {sql_tail}");
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
            .query_map(params, read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawAccount::into_account).collect()
    }
}

/// Row as stored, before the type-specific fields are validated.
struct RawAccount {
    reference_id: String,
    username: String,
    account_type: String,
    status: String,
    verification_code: Option<String>,
    payment_amount_usd_cents: Option<i64>,
    payment_amount_hive_milli: Option<i64>,
    hive_price_snapshot: Option<f64>,
    created_at: i64,
    paid_at: Option<i64>,
    creation_status: Option<String>,
    creation_error: Option<String>,
    creation_attempted_at: Option<i64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawAccount> {
    Ok(RawAccount {
        reference_id: row.get(0)?,
        username: row.get(1)?,
        account_type: row.get(2)?,
        status: row.get(3)?,
        verification_code: row.get(4)?,
        payment_amount_usd_cents: row.get(5)?,
        payment_amount_hive_milli: row.get(6)?,
        hive_price_snapshot: row.get(7)?,
        created_at: row.get(8)?,
        paid_at: row.get(9)?,
        creation_status: row.get(10)?,
        creation_error: row.get(11)?,
        creation_attempted_at: row.get(12)?,
    })
}

fn non_negative(value: i64, column: &str, id: &str) -> Result<u64, SignupError> {
    u64::try_from(value)
        .map_err(|_| SignupError::Internal(format!("negative {column} on signup {id}")))
}

impl RawAccount {
    fn into_account(self) -> Result<PendingAccount, SignupError> {
        let id = self.reference_id.as_str();
        let terms = match self.account_type.parse::<AccountType>()? {
            AccountType::Free => AccountTerms::Free {
                verification_code: self.verification_code.ok_or_else(|| {
                    SignupError::Internal(format!("free signup {id} has no verification code"))
                })?,
            },
            AccountType::Paid => match (
                self.payment_amount_usd_cents,
                self.payment_amount_hive_milli,
                self.hive_price_snapshot,
            ) {
                (Some(usd), Some(hive), Some(rate)) => AccountTerms::Paid(PaidTerms {
                    payment_amount_usd: UsdAmount::from_cents(non_negative(
                        usd,
                        "payment_amount_usd_cents",
                        id,
                    )?),
                    payment_amount_hive: HiveAmount::from_milli(non_negative(
                        hive,
                        "payment_amount_hive_milli",
                        id,
                    )?),
                    hive_price_snapshot: rate,
                }),
                _ => {
                    return Err(SignupError::Internal(format!(
                        "paid signup {id} is missing payment fields"
                    )))
                }
            },
        };

        Ok(PendingAccount {
            status: self.status.parse()?,
            creation_status: self
                .creation_status
                .as_deref()
                .map(str::parse::<CreationStatus>)
                .transpose()?,
            reference_id: ReferenceId::from(self.reference_id),
            username: self.username,
            terms,
            created_at: self.created_at,
            paid_at: self.paid_at,
            creation_attempted_at: self.creation_attempted_at,
            creation_error: self.creation_error,
        })
    }
}

impl Ledger for SqliteLedger {
    fn create(&self, account: &PendingAccount) -> Result<(), SignupError> {
        let conn = self.lock()?;

        let (verification_code, usd, hive, rate) = match &account.terms {
            AccountTerms::Free { verification_code } => {
                (Some(verification_code.as_str()), None, None, None)
            }
            AccountTerms::Paid(t) => (
                None,
                Some(t.payment_amount_usd.cents() as i64),
                Some(t.payment_amount_hive.milli() as i64),
                Some(t.hive_price_snapshot),
            ),
        };

        conn.execute(
            r#"
            INSERT INTO pending_accounts
            (reference_id, username, account_type, status, verification_code,
             payment_amount_usd_cents, payment_amount_hive_milli, hive_price_snapshot, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                account.reference_id.as_str(),
                account.username,
                account.account_type().as_str(),
                account.status.as_str(),
                verification_code,
                usd,
                hive,
                rate,
                account.created_at,
            ],
        )
        .map_err(|e| match SignupError::from(e) {
            SignupError::DuplicateUsername(_) => {
                SignupError::DuplicateUsername(account.username.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    fn find_by_reference_id(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError> {
        let conn = self.lock()?;
        Self::select_one(&conn, "reference_id = ?1", id)?.ok_or_else(|| not_found(id))
    }

    fn find_pending_by_reference_id(
        &self,
        id: &ReferenceId,
    ) -> Result<PendingAccount, SignupError> {
        let conn = self.lock()?;
        Self::select_one(&conn, "reference_id = ?1 AND status = 'pending'", id)?
            .ok_or_else(|| not_pending(id))
    }

    fn mark_paid(&self, id: &ReferenceId) -> Result<PendingAccount, SignupError> {
        let conn = self.lock()?;
        // Conditional UPDATE: only one caller can match the pending row, even
        // across processes sharing the file.
        let updated = conn.execute(
            "UPDATE pending_accounts SET status = 'paid', paid_at = ?2, \
             creation_status = 'pending', creation_attempted_at = ?2 \
             WHERE reference_id = ?1 AND status = 'pending'",
            params![id.as_str(), unix_millis()],
        )?;
        if updated == 0 {
            return Err(not_pending(id));
        }
        Self::select_one(&conn, "reference_id = ?1", id)?.ok_or_else(|| not_found(id))
    }

    fn claim_creation_retry(
        &self,
        id: &ReferenceId,
        stale_before: i64,
    ) -> Result<Option<PendingAccount>, SignupError> {
        let conn = self.lock()?;
        // Same claim discipline as mark_paid: the WHERE clause is the guard.
        let updated = conn.execute(
            "UPDATE pending_accounts SET creation_status = 'pending', creation_error = NULL, \
             creation_attempted_at = ?2 \
             WHERE reference_id = ?1 AND status = 'paid' AND (\
                 creation_status IS NULL OR creation_status = 'failed' OR \
                 (creation_status = 'pending' AND \
                  (creation_attempted_at IS NULL OR creation_attempted_at < ?3)))",
            params![id.as_str(), unix_millis(), stale_before],
        )?;
        if updated == 0 {
            return match Self::select_one(&conn, "reference_id = ?1", id)? {
                Some(_) => Ok(None),
                None => Err(not_found(id)),
            };
        }
        Self::select_one(&conn, "reference_id = ?1", id)
    }

    fn record_creation(
        &self,
        id: &ReferenceId,
        outcome: &CreationOutcome,
    ) -> Result<(), SignupError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE pending_accounts SET creation_status = ?2, creation_error = ?3 \
             WHERE reference_id = ?1 AND status = 'paid'",
            params![id.as_str(), outcome.status().as_str(), outcome.error()],
        )?;
        if updated == 0 {
            return Err(SignupError::NotFound(format!("signup {id} is not paid")));
        }
        Ok(())
    }

    fn list_by_status(
        &self,
        status: AccountStatus,
        limit: u32,
    ) -> Result<Vec<PendingAccount>, SignupError> {
        let conn = self.lock()?;
        Self::select_many(
            &conn,
            "WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
            params![status.as_str(), limit],
        )
    }

    fn list_unfulfilled(&self, limit: u32) -> Result<Vec<PendingAccount>, SignupError> {
        let conn = self.lock()?;
        Self::select_many(
            &conn,
            "WHERE status = 'paid' AND (creation_status IS NULL OR creation_status != 'created') \
             ORDER BY paid_at ASC LIMIT ?1",
            params![limit],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn free(username: &str) -> PendingAccount {
        PendingAccount::new(
            ReferenceId::generate(),
            username.to_string(),
            AccountTerms::Free {
                verification_code: "123456".to_string(),
            },
            unix_millis(),
        )
    }

    fn paid(username: &str, created_at: i64) -> PendingAccount {
        PendingAccount::new(
            ReferenceId::generate(),
            username.to_string(),
            AccountTerms::Paid(PaidTerms {
                payment_amount_usd: UsdAmount::from_cents(300),
                payment_amount_hive: HiveAmount::from_milli(750),
                hive_price_snapshot: 4.0,
            }),
            created_at,
        )
    }

    fn ledgers() -> Vec<(&'static str, Box<dyn Ledger>)> {
        vec![
            ("memory", Box::new(InMemoryLedger::new())),
            ("sqlite", Box::new(SqliteLedger::open_in_memory().unwrap())),
        ]
    }

    #[test]
    fn create_and_find() {
        for (name, ledger) in ledgers() {
            let account = paid("alice", 10);
            ledger.create(&account).unwrap();

            let found = ledger.find_by_reference_id(&account.reference_id).unwrap();
            assert_eq!(found, account, "{name}");

            let pending = ledger
                .find_pending_by_reference_id(&account.reference_id)
                .unwrap();
            assert_eq!(pending.reference_id, account.reference_id, "{name}");
        }
    }

    #[test]
    fn unknown_reference_is_not_found() {
        for (name, ledger) in ledgers() {
            let id = ReferenceId::from("missing");
            assert!(ledger.find_by_reference_id(&id).unwrap_err().is_not_found(), "{name}");
            assert!(ledger.mark_paid(&id).unwrap_err().is_not_found(), "{name}");
        }
    }

    #[test]
    fn duplicate_username_rejected_in_any_status() {
        for (name, ledger) in ledgers() {
            let first = free("bob");
            ledger.create(&first).unwrap();

            let err = ledger.create(&paid("bob", 1)).unwrap_err();
            assert!(matches!(err, SignupError::DuplicateUsername(ref u) if u == "bob"), "{name}");

            let other = paid("carol", 1);
            ledger.create(&other).unwrap();
            ledger.mark_paid(&other.reference_id).unwrap();
            let err = ledger.create(&free("carol")).unwrap_err();
            assert!(matches!(err, SignupError::DuplicateUsername(_)), "{name}");
        }
    }

    #[test]
    fn mark_paid_transitions_exactly_once() {
        for (name, ledger) in ledgers() {
            let account = paid("dave", 1);
            ledger.create(&account).unwrap();

            let updated = ledger.mark_paid(&account.reference_id).unwrap();
            assert_eq!(updated.status, AccountStatus::Paid, "{name}");
            assert!(updated.paid_at.is_some(), "{name}");
            assert_eq!(updated.creation_status, Some(CreationStatus::Pending), "{name}");
            assert_eq!(updated.terms, account.terms, "{name}");

            let again = ledger.mark_paid(&account.reference_id).unwrap_err();
            assert!(again.is_not_found(), "{name}");

            // Still readable, no longer pending.
            assert!(ledger
                .find_pending_by_reference_id(&account.reference_id)
                .unwrap_err()
                .is_not_found());
            assert_eq!(
                ledger.find_by_reference_id(&account.reference_id).unwrap().status,
                AccountStatus::Paid
            );
        }
    }

    #[test]
    fn concurrent_mark_paid_has_single_winner() {
        for (name, ledger) in ledgers() {
            let account = paid("erin", 1);
            ledger.create(&account).unwrap();
            let winners = AtomicUsize::new(0);

            std::thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| {
                        if ledger.mark_paid(&account.reference_id).is_ok() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(winners.load(Ordering::SeqCst), 1, "{name}");
        }
    }

    #[test]
    fn creation_outcomes_drive_unfulfilled_scan() {
        for (name, ledger) in ledgers() {
            let ok = paid("frank", 1);
            let broken = paid("grace", 2);
            let unpaid = paid("heidi", 3);
            for a in [&ok, &broken, &unpaid] {
                ledger.create(a).unwrap();
            }
            ledger.mark_paid(&ok.reference_id).unwrap();
            ledger.mark_paid(&broken.reference_id).unwrap();

            ledger
                .record_creation(&ok.reference_id, &CreationOutcome::Created)
                .unwrap();
            ledger
                .record_creation(
                    &broken.reference_id,
                    &CreationOutcome::Failed("upstream 502".to_string()),
                )
                .unwrap();

            let unfulfilled = ledger.list_unfulfilled(10).unwrap();
            assert_eq!(unfulfilled.len(), 1, "{name}");
            assert_eq!(unfulfilled[0].username, "grace");
            assert_eq!(unfulfilled[0].creation_status, Some(CreationStatus::Failed));
            assert_eq!(unfulfilled[0].creation_error.as_deref(), Some("upstream 502"));

            // Only paid records can carry a creation outcome.
            assert!(ledger
                .record_creation(&unpaid.reference_id, &CreationOutcome::Created)
                .is_err());
        }
    }

    #[test]
    fn retry_claim_only_from_failed_or_stale_attempts() {
        for (name, ledger) in ledgers() {
            let account = paid("oscar", 1);
            ledger.create(&account).unwrap();
            let id = &account.reference_id;

            assert!(ledger.claim_creation_retry(id, i64::MAX).unwrap().is_none(), "{name}");

            let attempted = ledger.mark_paid(id).unwrap().creation_attempted_at.unwrap();
            // First attempt still inside its window.
            assert!(ledger.claim_creation_retry(id, attempted).unwrap().is_none(), "{name}");
            // Same attempt once it is older than the cutoff.
            let claimed = ledger.claim_creation_retry(id, attempted + 1).unwrap().unwrap();
            assert_eq!(claimed.creation_status, Some(CreationStatus::Pending), "{name}");

            ledger
                .record_creation(id, &CreationOutcome::Failed("timeout".to_string()))
                .unwrap();
            let claimed = ledger.claim_creation_retry(id, 0).unwrap().unwrap();
            assert!(claimed.creation_error.is_none(), "{name}");
            assert!(ledger.claim_creation_retry(id, 0).unwrap().is_none(), "{name}");

            ledger.record_creation(id, &CreationOutcome::Created).unwrap();
            assert!(ledger.claim_creation_retry(id, i64::MAX).unwrap().is_none(), "{name}");

            assert!(ledger
                .claim_creation_retry(&ReferenceId::generate(), 0)
                .unwrap_err()
                .is_not_found());
        }
    }

    #[test]
    fn concurrent_retry_claims_have_single_winner() {
        for (name, ledger) in ledgers() {
            let account = paid("peggy", 1);
            ledger.create(&account).unwrap();
            ledger.mark_paid(&account.reference_id).unwrap();
            ledger
                .record_creation(
                    &account.reference_id,
                    &CreationOutcome::Failed("upstream 502".to_string()),
                )
                .unwrap();

            let winners = AtomicUsize::new(0);
            std::thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| {
                        if let Ok(Some(_)) = ledger.claim_creation_retry(&account.reference_id, 0) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(winners.load(Ordering::SeqCst), 1, "{name}");
        }
    }

    #[test]
    fn list_by_status_newest_first() {
        for (name, ledger) in ledgers() {
            let old = paid("ivan", 100);
            let new = paid("judy", 200);
            let settled = paid("mallory", 150);
            for a in [&old, &new, &settled] {
                ledger.create(a).unwrap();
            }
            ledger.mark_paid(&settled.reference_id).unwrap();

            let pending = ledger.list_by_status(AccountStatus::Pending, 10).unwrap();
            let names: Vec<_> = pending.iter().map(|a| a.username.as_str()).collect();
            assert_eq!(names, vec!["judy", "ivan"], "{name}");

            let limited = ledger.list_by_status(AccountStatus::Pending, 1).unwrap();
            assert_eq!(limited.len(), 1, "{name}");

            let paid_rows = ledger.list_by_status(AccountStatus::Paid, 10).unwrap();
            assert_eq!(paid_rows.len(), 1, "{name}");
            assert_eq!(paid_rows[0].username, "mallory");
        }
    }

    #[test]
    fn sqlite_ledger_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();
        let account = free("niaj");

        {
            let ledger = SqliteLedger::open(path).unwrap();
            ledger.create(&account).unwrap();
        }

        {
            let ledger = SqliteLedger::open(path).unwrap();
            let found = ledger.find_by_reference_id(&account.reference_id).unwrap();
            assert_eq!(found, account);
        }
    }
}
