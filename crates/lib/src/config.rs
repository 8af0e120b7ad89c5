//! Server configuration

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::files::DEFAULT_MAX_UPLOAD_BYTES;

/// File name of the encrypted account ledger inside the data directory.
pub const LEDGER_FILE: &str = "users.enc";

/// Directory holding per-user storage inside the data directory.
pub const STORAGE_DIR: &str = "storage";

/// Browser origin allowed to call the API with credentials by default.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3001";

/// Per-client-IP request limit.
///
/// One request token is replenished every `per_second` seconds, up to
/// `burst_size` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    /// Roughly 100 requests per 15 minutes.
    fn default() -> Self {
        Self {
            per_second: 9,
            burst_size: 100,
        }
    }
}

/// Everything needed to open a Shelfs instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Holds the ledger file and the storage directory
    pub data_dir: PathBuf,
    /// Passphrase the ledger encryption key is derived from
    #[serde(skip_serializing)]
    pub encryption_key: String,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: u64,
    /// `None` disables rate limiting
    pub rate_limit: Option<RateLimitConfig>,
    /// Mark the session cookie `Secure` and send `Strict-Transport-Security`
    pub secure_cookies: bool,
    /// Origins allowed to make credentialed cross-origin requests; empty
    /// disables CORS
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            encryption_key: String::new(),
            session_ttl_secs: 24 * 60 * 60,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit: Some(RateLimitConfig::default()),
            secure_cookies: false,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

impl Config {
    /// Default configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, encryption_key: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            encryption_key: encryption_key.into(),
            ..Self::default()
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join(STORAGE_DIR)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
