//! Error types for the account ledger
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("Username already exists: {username}")]
    UsernameAlreadyExists { username: String },

    /// Unknown username or wrong password. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Ledger storage failed: {reason}")]
    Storage {
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl LedgerError {
    /// Check if this error indicates a duplicate account.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::UsernameAlreadyExists { .. })
    }

    /// Check if this error is a credential check failure.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, LedgerError::InvalidCredentials)
    }

    /// Check if this error came from the persistence layer.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, LedgerError::Storage { .. })
    }
}

impl From<LedgerError> for crate::Error {
    fn from(err: LedgerError) -> Self {
        crate::Error::Ledger(err)
    }
}
