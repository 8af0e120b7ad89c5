//! Error types for the session authority
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// Missing, unknown or expired session token.
    #[error("Unauthenticated")]
    Unauthenticated,
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
