//! Credential cipher
//!
//! Symmetric, authenticated encryption for everything the account ledger
//! keeps at rest:
//! - AES-256-GCM with a fresh random nonce for every call
//! - Argon2id to stretch the configured secret into a 256-bit key
//!
//! Ciphertexts are opaque base64 strings laid out as `nonce || ciphertext || tag`.

pub mod errors;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng},
};
use argon2::Argon2;
use base64ct::{Base64, Encoding};
use zeroize::Zeroizing;

pub use errors::CipherError;

use crate::Result;

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

/// Authentication tag appended by AES-GCM
pub const TAG_LENGTH: usize = 16;

/// Key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Fixed salt for stretching the process-wide secret.
///
/// There is exactly one key per deployment, so the salt only has to separate
/// this use of the secret from any other.
const KEY_DERIVATION_SALT: &[u8] = b"shelfs/credential-cipher/v1";

/// Process-wide symmetric cipher for credential material.
#[derive(Clone)]
pub struct CredentialCipher {
    key: Zeroizing<[u8; KEY_LENGTH]>,
}

impl CredentialCipher {
    /// Derive the cipher key from a configured secret of any length.
    ///
    /// The same secret always yields the same key, so a ledger written by one
    /// process can be read by the next one started with the same configuration.
    pub fn from_secret(secret: impl AsRef<str>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CipherError::KeyDerivationFailed {
                reason: "secret must not be empty".to_string(),
            }
            .into());
        }

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        Argon2::default()
            .hash_password_into(secret.as_bytes(), KEY_DERIVATION_SALT, &mut key[..])
            .map_err(|e| CipherError::KeyDerivationFailed {
                reason: e.to_string(),
            })?;

        Ok(Self { key })
    }

    /// Build a cipher from raw key bytes.
    pub fn from_key_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        let key: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| CipherError::InvalidKeyLength {
                    expected: KEY_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self {
            key: Zeroizing::new(key),
        })
    }

    fn aead(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key[..]).map_err(|_| {
            CipherError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: self.key.len(),
            }
            .into()
        })
    }

    /// Encrypt `plaintext` into an opaque string.
    ///
    /// Each call draws a new nonce, so encrypting the same bytes twice gives
    /// two different ciphertexts.
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>) -> Result<String> {
        let cipher = self.aead()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|e| CipherError::EncryptionFailed {
                reason: e.to_string(),
            })?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(Base64::encode_string(&sealed))
    }

    /// Decrypt a string produced by [`CredentialCipher::encrypt`].
    ///
    /// Fails on malformed encodings, truncated input, tampering, and on a
    /// ciphertext sealed under a different key. It never hands back garbage.
    pub fn decrypt(&self, ciphertext: impl AsRef<str>) -> Result<Vec<u8>> {
        let sealed = Base64::decode_vec(ciphertext.as_ref().trim()).map_err(|e| {
            CipherError::DecryptionFailed {
                reason: format!("invalid encoding: {e}"),
            }
        })?;

        let minimum = NONCE_LENGTH + TAG_LENGTH;
        if sealed.len() < minimum {
            return Err(CipherError::CiphertextTooShort {
                minimum,
                actual: sealed.len(),
            }
            .into());
        }

        let (nonce, body) = sealed.split_at(NONCE_LENGTH);
        let cipher = self.aead()?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| CipherError::DecryptionFailed {
                reason: "authentication failed".to_string(),
            })?;

        Ok(plaintext)
    }

    /// Decrypt and interpret the plaintext as UTF-8.
    pub fn decrypt_string(&self, ciphertext: impl AsRef<str>) -> Result<Zeroizing<String>> {
        let bytes = self.decrypt(ciphertext)?;
        let text = String::from_utf8(bytes).map_err(|_| CipherError::DecryptionFailed {
            reason: "plaintext is not valid UTF-8".to_string(),
        })?;
        Ok(Zeroizing::new(text))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}
