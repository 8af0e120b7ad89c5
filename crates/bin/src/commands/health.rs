//! Health command - asks a running server whether its ledger and storage
//! are usable.

use std::time::Duration;

use reqwest::StatusCode;
use shelfs::api::{CheckStatus, HealthReport};

use crate::cli::HealthArgs;

fn health_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/health") {
        base.to_string()
    } else {
        format!("{base}/health")
    }
}

fn describe(check: CheckStatus) -> &'static str {
    match check {
        CheckStatus::Ok => "ok",
        CheckStatus::Unavailable => "UNAVAILABLE",
    }
}

/// Fetch the server's readiness report.
///
/// A degraded server answers 503 with a full report, so that is returned
/// as a report rather than an error.
async fn fetch_report(url: &str, timeout: Duration) -> Result<HealthReport, String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("failed to connect to {url}: {e}"))?;

    let status = response.status();
    if status != StatusCode::OK && status != StatusCode::SERVICE_UNAVAILABLE {
        return Err(format!("server returned HTTP status {status}"));
    }
    response
        .json::<HealthReport>()
        .await
        .map_err(|e| format!("unexpected health response from {url}: {e}"))
}

/// Run the health check command
pub async fn run(args: &HealthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let url = health_url(&args.url);

    match fetch_report(&url, Duration::from_secs(args.timeout)).await {
        Ok(report) => {
            println!(
                "shelfs {}: ledger {}, storage {}",
                report.version,
                describe(report.ledger),
                describe(report.storage)
            );
            if report.is_healthy() {
                Ok(())
            } else {
                eprintln!("unhealthy: server is degraded");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("unhealthy: {e}");
            std::process::exit(1);
        }
    }
}
