//! Account ledger
//!
//! All accounts live in one JSON document, sealed with the
//! [`CredentialCipher`] and stored through a [`LedgerBackend`]. Every
//! operation reads the whole blob fresh; every mutation rewrites it.
//!
//! Mutations hold a single writer lock for the full load-mutate-save cycle,
//! so two concurrent signups can never overwrite each other.

pub mod backend;
pub mod errors;
pub mod types;

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

pub use backend::{FileBackend, InMemory, LedgerBackend};
pub use errors::LedgerError;
pub use types::{AccountProfile, AccountRecord, Ledger};

use crate::{Clock, Result, cipher::CredentialCipher};

/// Plaintext the original service seeded fresh ledger files with.
const LEGACY_EMPTY_LEDGER: &str = "{}";

/// Encrypted username → account store.
#[derive(Debug)]
pub struct AccountLedger {
    backend: Arc<dyn LedgerBackend>,
    cipher: CredentialCipher,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl AccountLedger {
    pub fn new(
        backend: Arc<dyn LedgerBackend>,
        cipher: CredentialCipher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            cipher,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Read the current ledger.
    ///
    /// A missing blob is initialized to an encrypted empty ledger. A blob
    /// that fails to decrypt or parse is logged and treated as empty rather
    /// than failing the request.
    pub async fn load(&self) -> Result<Ledger> {
        if let Some(ledger) = self.read_existing().await? {
            return Ok(ledger);
        }
        let _guard = self.write_lock.lock().await;
        self.load_locked().await
    }

    /// Like [`AccountLedger::load`], for callers already holding the writer lock.
    async fn load_locked(&self) -> Result<Ledger> {
        if let Some(ledger) = self.read_existing().await? {
            return Ok(ledger);
        }
        let ledger = Ledger::new();
        self.save(&ledger).await?;
        tracing::info!("Initialized empty account ledger");
        Ok(ledger)
    }

    async fn read_existing(&self) -> Result<Option<Ledger>> {
        let Some(blob) = self.backend.read().await? else {
            return Ok(None);
        };

        let blob = blob.trim();
        if blob.is_empty() || blob == LEGACY_EMPTY_LEDGER {
            return Ok(Some(Ledger::new()));
        }

        let plaintext = match self.cipher.decrypt(blob) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::error!("Account ledger could not be decrypted, treating as empty: {e}");
                return Ok(Some(Ledger::new()));
            }
        };

        match serde_json::from_slice::<Ledger>(&plaintext) {
            Ok(ledger) => Ok(Some(ledger)),
            Err(e) => {
                tracing::error!("Account ledger could not be parsed, treating as empty: {e}");
                Ok(Some(Ledger::new()))
            }
        }
    }

    /// Serialize, encrypt and atomically replace the stored ledger.
    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        let json = serde_json::to_vec(ledger)?;
        let blob = self.cipher.encrypt(&json)?;
        self.backend.write(&blob).await
    }

    /// Register a new account.
    ///
    /// Usernames are compared exactly; `alice` and `Alice` are different
    /// accounts.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<AccountRecord> {
        let _guard = self.write_lock.lock().await;

        let mut ledger = self.load_locked().await?;
        if ledger.contains(username) {
            return Err(LedgerError::UsernameAlreadyExists {
                username: username.to_string(),
            }
            .into());
        }

        let record = AccountRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_cipher: self.cipher.encrypt(password)?,
            email: email.filter(|e| !e.is_empty()).map(str::to_string),
            created_at: self.clock.now(),
        };
        ledger.insert(record.clone());
        self.save(&ledger).await?;

        tracing::info!("Created account {} ({})", record.username, record.id);
        Ok(record)
    }

    /// Check a username/password pair and return the matching account.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<AccountRecord> {
        let ledger = self.load().await?;
        let Some(record) = ledger.get(username) else {
            return Err(LedgerError::InvalidCredentials.into());
        };

        let stored = match self.cipher.decrypt_string(&record.password_cipher) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Stored password for {username} could not be decrypted: {e}");
                return Err(LedgerError::InvalidCredentials.into());
            }
        };

        if bool::from(stored.as_bytes().ct_eq(password.as_bytes())) {
            Ok(record.clone())
        } else {
            Err(LedgerError::InvalidCredentials.into())
        }
    }

    /// Look up an account by exact username.
    pub async fn get(&self, username: &str) -> Result<Option<AccountRecord>> {
        Ok(self.load().await?.get(username).cloned())
    }
}
