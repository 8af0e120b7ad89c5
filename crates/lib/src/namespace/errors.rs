//! Error types for the per-user file namespace
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NamespaceError {
    /// The requested name would leave the user's directory, or is not a
    /// usable name at all. The message never says whether anything exists
    /// at the escaped location.
    #[error("Invalid path")]
    InvalidPath { reason: &'static str },

    #[error("Storage I/O failed: {reason}")]
    Io {
        reason: String,
        #[source]
        source: std::io::Error,
    },
}

impl NamespaceError {
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, NamespaceError::InvalidPath { .. })
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, NamespaceError::Io { .. })
    }
}

impl From<NamespaceError> for crate::Error {
    fn from(err: NamespaceError) -> Self {
        crate::Error::Namespace(err)
    }
}
