//!
//! Shelfs: a small personal file storage service.
//!
//! Users sign up with a username and password, log in to get a session
//! cookie, and then upload, list, download, delete and preview files in a
//! directory of their own.
//!
//! ## Core Concepts
//!
//! * **Credential cipher (`cipher::CredentialCipher`)**: Authenticated
//!   symmetric encryption used for stored passwords and for the account
//!   ledger as a whole.
//! * **Account ledger (`ledger::AccountLedger`)**: Every account in one
//!   encrypted JSON document, persisted through a pluggable
//!   `ledger::LedgerBackend`.
//! * **Session authority (`session::SessionAuthority`)**: In-memory map of
//!   opaque session tokens to authenticated identities with absolute expiry.
//! * **File namespace (`namespace::FileNamespace`)**: The only code that
//!   turns a username and client filename into a path, confined to that
//!   user's directory.
//! * **File registry (`files::FileRegistry`)**: List, store, retrieve,
//!   remove and preview operations over the namespace.
//! * **HTTP API (`api`)**: The axum router tying it all together.

pub mod api;
pub mod cipher;
pub mod clock;
pub mod config;
pub mod files;
pub mod ledger;
pub mod namespace;
pub mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;

/// Result type used throughout the Shelfs library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Shelfs library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured encryption errors from the cipher module
    #[error(transparent)]
    Cipher(cipher::CipherError),

    /// Structured account errors from the ledger module
    #[error(transparent)]
    Ledger(ledger::LedgerError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Structured path errors from the namespace module
    #[error(transparent)]
    Namespace(namespace::NamespaceError),

    /// Structured file errors from the files module
    #[error(transparent)]
    Files(files::FileError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Cipher(_) => "cipher",
            Error::Ledger(_) => "ledger",
            Error::Session(_) => "session",
            Error::Namespace(_) => "namespace",
            Error::Files(_) => "files",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Files(files_err) => files_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Ledger(ledger_err) => ledger_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Ledger(ledger_err) => ledger_err.is_authentication_error(),
            Error::Session(_) => true,
            _ => false,
        }
    }

    /// Check if this error is a rejected client path.
    pub fn is_invalid_path(&self) -> bool {
        match self {
            Error::Namespace(ns_err) => ns_err.is_invalid_path(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    ///
    /// Covers rejected paths, oversized uploads, bad file names and
    /// unsupported previews.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Namespace(ns_err) => ns_err.is_invalid_path(),
            Error::Files(files_err) => files_err.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Ledger(ledger_err) => ledger_err.is_storage_error(),
            Error::Namespace(ns_err) => ns_err.is_io_error(),
            Error::Files(files_err) => files_err.is_io_error(),
            _ => false,
        }
    }
}
