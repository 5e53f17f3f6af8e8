use thiserror::Error;

/// Errors returned by signup operations.
#[derive(Debug, Error)]
pub enum SignupError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("username already registered: {0}")]
    DuplicateUsername(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A creation attempt for this signup may still be running.
    #[error("account creation in progress: {0}")]
    CreationInProgress(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed amount: {0}")]
    MalformedAmount(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// SQLITE_CONSTRAINT_UNIQUE
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

impl From<rusqlite::Error> for SignupError {
    fn from(e: rusqlite::Error) -> Self {
        // The only UNIQUE (non primary key) constraint on the ledger is username.
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            if err.extended_code == SQLITE_CONSTRAINT_UNIQUE {
                return SignupError::DuplicateUsername("username already registered".to_string());
            }
        }
        SignupError::Database(e)
    }
}

impl SignupError {
    /// `true` for errors that mean "no such record (in the requested state)".
    pub fn is_not_found(&self) -> bool {
        matches!(self, SignupError::NotFound(_))
    }
}
