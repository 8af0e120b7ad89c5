//! CLI argument definitions for the Shelfs binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shelfs personal file storage server
#[derive(Parser, Debug)]
#[command(name = "shelfs")]
#[command(about = "Shelfs: personal file storage server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Shelfs server
    Serve(ServeArgs),
    /// Check health of a running Shelfs server
    Health(HealthArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "SHELFS_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "SHELFS_HOST")]
    pub host: String,

    /// Data directory holding users.enc and the storage/ tree
    #[arg(short = 'D', long, default_value = "data", env = "SHELFS_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Passphrase the ledger encryption key is derived from
    #[arg(long, env = "SHELFS_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Session lifetime in seconds
    #[arg(long, default_value_t = 86400, env = "SHELFS_SESSION_TTL")]
    pub session_ttl: u64,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = 100, env = "SHELFS_MAX_UPLOAD_MB")]
    pub max_upload_mb: u64,

    /// Requests a client may make in a burst
    #[arg(long, default_value_t = 100, env = "SHELFS_RATE_LIMIT_BURST")]
    pub rate_limit_burst: u32,

    /// Seconds to replenish one request token
    #[arg(long, default_value_t = 9, env = "SHELFS_RATE_LIMIT_PERIOD")]
    pub rate_limit_period: u64,

    /// Disable per-client rate limiting
    #[arg(long, env = "SHELFS_NO_RATE_LIMIT")]
    pub no_rate_limit: bool,

    /// Mark the session cookie Secure and send HSTS (serve behind HTTPS)
    #[arg(long, env = "SHELFS_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Browser origins allowed to call the API with credentials; pass an
    /// empty value to disable CORS
    #[arg(
        long = "cors-origin",
        env = "SHELFS_FRONTEND_URL",
        value_delimiter = ',',
        default_value = shelfs::config::DEFAULT_CORS_ORIGIN
    )]
    pub cors_origins: Vec<String>,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "SHELFS_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}
