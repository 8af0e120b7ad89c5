//! Error types for file registry operations
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileError {
    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("Preview not supported for this file type")]
    UnsupportedPreview { name: String },

    #[error("Invalid file name: {reason}")]
    InvalidName { reason: String },

    #[error("File I/O failed: {reason}")]
    Io {
        reason: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileError::NotFound { .. })
    }

    /// Errors caused by what the client sent rather than by the server.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            FileError::TooLarge { .. }
                | FileError::UnsupportedPreview { .. }
                | FileError::InvalidName { .. }
        )
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, FileError::Io { .. })
    }
}

impl From<FileError> for crate::Error {
    fn from(err: FileError) -> Self {
        crate::Error::Files(err)
    }
}
