//! Readiness reporting for GET /health

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Outcome of probing one backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Unavailable,
}

/// Body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub ledger: CheckStatus,
    pub storage: CheckStatus,
    pub version: String,
}

impl HealthReport {
    /// Probe the account ledger and the storage root.
    ///
    /// The ledger counts as available when it can be read; a blob that fails
    /// to decrypt still loads as empty, so only storage faults show up here.
    pub async fn check(state: &AppState) -> Self {
        let ledger = match state.ledger.load().await {
            Ok(_) => CheckStatus::Ok,
            Err(e) => {
                tracing::warn!("Health check: account ledger unavailable: {e}");
                CheckStatus::Unavailable
            }
        };

        let root = state.files.namespace().root();
        let storage = match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => CheckStatus::Ok,
            Ok(_) => {
                tracing::warn!("Health check: {} is not a directory", root.display());
                CheckStatus::Unavailable
            }
            Err(e) => {
                tracing::warn!("Health check: storage root {} unavailable: {e}", root.display());
                CheckStatus::Unavailable
            }
        };

        let status = if ledger == CheckStatus::Ok && storage == CheckStatus::Ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            ledger,
            storage,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Handler for GET /health
///
/// Answers 503 with the same body when a store is unavailable.
pub async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport::check(&state).await;
    let code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}
