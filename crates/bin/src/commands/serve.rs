//! Serve command - runs the Shelfs HTTP server.

use std::net::SocketAddr;

use shelfs::{
    Config,
    api::{self, AppState},
    config::RateLimitConfig,
};
use tokio::signal::unix::{SignalKind, signal};

use crate::cli::ServeArgs;

/// Passphrase used when none is configured. Only fit for local development.
const DEV_ENCRYPTION_KEY: &str = "shelfs-development-key-change-me";

fn config_from(args: &ServeArgs) -> Config {
    let encryption_key = match &args.encryption_key {
        Some(key) if !key.is_empty() => key.clone(),
        _ => {
            tracing::warn!(
                "SHELFS_ENCRYPTION_KEY is not set; using the built-in development key. \
                 Stored credentials are NOT protected."
            );
            DEV_ENCRYPTION_KEY.to_string()
        }
    };

    let rate_limit = (!args.no_rate_limit).then_some(RateLimitConfig {
        per_second: args.rate_limit_period,
        burst_size: args.rate_limit_burst,
    });

    Config {
        data_dir: args.data_dir.clone(),
        encryption_key,
        session_ttl_secs: args.session_ttl,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        rate_limit,
        secure_cookies: args.secure_cookies,
        cors_origins: args.cors_origins.clone(),
    }
}

/// Run the Shelfs server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = config_from(args);
    let state = AppState::open(&config).await?;
    let app = api::router(state);

    // Shutdown signals
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Bind server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!("Shelfs listening on http://{local_addr}");
    tracing::info!("Data directory: {}", config.data_dir.display());
    match config.rate_limit {
        Some(limit) => tracing::info!(
            "Rate limit: burst {} per client, one request every {}s after that",
            limit.burst_size,
            limit.per_second
        ),
        None => tracing::info!("Rate limiting disabled"),
    }
    let origins: Vec<&str> = config
        .cors_origins
        .iter()
        .map(String::as_str)
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        tracing::info!("CORS disabled");
    } else {
        tracing::info!("CORS origins: {}", origins.join(", "));
    }

    // Start server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
            _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
        }
    })
    .await?;

    tracing::info!("Server shut down");
    Ok(())
}
