//! Account ledger data types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One registered account.
///
/// The username is the ledger key and never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: Uuid,
    pub username: String,
    /// Password sealed with the credential cipher
    #[serde(rename = "password")]
    pub password_cipher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    /// The fields safe to hand back to a client.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone().unwrap_or_default(),
        }
    }
}

/// Public view of an account, without credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// The full set of accounts, keyed by exact (case-sensitive) username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    accounts: BTreeMap<String, AccountRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&AccountRecord> {
        self.accounts.get(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    /// Insert a record under its own username.
    ///
    /// Returns `false` and leaves the ledger untouched if the username is taken.
    pub fn insert(&mut self, record: AccountRecord) -> bool {
        if self.accounts.contains_key(&record.username) {
            return false;
        }
        self.accounts.insert(record.username.clone(), record);
        true
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountRecord> {
        self.accounts.values()
    }
}
