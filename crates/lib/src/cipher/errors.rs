//! Error types for the credential cipher
use thiserror::Error;

/// Errors raised while encrypting or decrypting credential material.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CipherError {
    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Ciphertext too short: need at least {minimum} bytes, got {actual}")]
    CiphertextTooShort { minimum: usize, actual: usize },

    #[error("Key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },
}

impl CipherError {
    /// Check if this error came from reading back a ciphertext.
    ///
    /// Covers wrong keys, tampered data, and malformed encodings.
    pub fn is_decryption_error(&self) -> bool {
        matches!(
            self,
            CipherError::DecryptionFailed { .. } | CipherError::CiphertextTooShort { .. }
        )
    }
}

impl From<CipherError> for crate::Error {
    fn from(err: CipherError) -> Self {
        crate::Error::Cipher(err)
    }
}
