//! HTTP interface
//!
//! JSON endpoints for account management and file operations, with the
//! session carried in an HttpOnly cookie. [`router`] builds the complete
//! axum application from an [`AppState`].
//!
//! Every response carries a fixed set of security headers. Browser clients
//! on the configured origins may call the API cross-origin with the session
//! cookie attached.

pub mod auth;
pub mod errors;
pub mod files;
pub mod health;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tokio::task::JoinHandle;
use tower_cookies::CookieManagerLayer;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

pub use auth::{AuthSession, SESSION_COOKIE};
pub use errors::{ApiError, ApiResult};
pub use health::{CheckStatus, HealthReport, HealthStatus};

use crate::{
    Clock, Config, Result, SystemClock,
    cipher::CredentialCipher,
    config::RateLimitConfig,
    files::FileRegistry,
    ledger::{AccountLedger, FileBackend},
    namespace::FileNamespace,
    session::SessionAuthority,
};

/// How often expired sessions are swept from memory.
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// How often idle rate limiter entries are dropped.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Headers set on every response that does not already carry them.
const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (
        HeaderName::from_static("x-permitted-cross-domain-policies"),
        "none",
    ),
    (
        HeaderName::from_static("cross-origin-opener-policy"),
        "same-origin",
    ),
];

/// Sent only when cookies are marked Secure, i.e. behind HTTPS.
const HSTS: &str = "max-age=15552000; includeSubDomains";

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub ledger: Arc<AccountLedger>,
    pub sessions: SessionAuthority,
    pub files: FileRegistry,
    pub max_upload_bytes: u64,
    pub secure_cookies: bool,
    pub rate_limit: Option<RateLimitConfig>,
    pub cors_origins: Arc<[String]>,
}

impl AppState {
    /// Open the ledger and storage described by `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Like [`AppState::open`] with an explicit clock.
    pub async fn open_with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let cipher = CredentialCipher::from_secret(&config.encryption_key)?;
        let backend = Arc::new(FileBackend::new(config.ledger_path()));
        let ledger = AccountLedger::new(backend, cipher, clock.clone());
        let accounts = ledger.load().await?.len();
        tracing::info!(
            "Opened account ledger at {} ({accounts} accounts)",
            config.ledger_path().display()
        );

        let namespace = FileNamespace::open(config.storage_dir()).await?;
        tracing::info!("Serving files from {}", namespace.root().display());

        Ok(Self {
            ledger: Arc::new(ledger),
            sessions: SessionAuthority::new(config.session_ttl(), clock.clone()),
            files: FileRegistry::new(namespace, clock),
            max_upload_bytes: config.max_upload_bytes,
            secure_cookies: config.secure_cookies,
            rate_limit: config.rate_limit,
            cors_origins: config.cors_origins.clone().into(),
        })
    }
}

/// Build the full router.
///
/// CORS is the outermost layer so preflight requests are answered before
/// session or rate limit handling. Must be called inside a tokio runtime: it spawns the session purge task
/// and, when rate limiting is on, the limiter cleanup task. The rate limiter
/// keys on the peer address, so serve the router with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: AppState) -> Router {
    spawn_session_purge(state.sessions.clone(), SESSION_PURGE_INTERVAL);

    let api = Router::new()
        .route("/auth/signup", post(auth::handle_signup))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/status", get(auth::handle_status))
        .route("/files/list", get(files::handle_list))
        .route(
            "/files/upload",
            post(files::handle_upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/files/download/{filename}", get(files::handle_download))
        .route("/files/preview/{filename}", get(files::handle_preview))
        .route("/files/{filename}", delete(files::handle_delete));

    let api = match state.rate_limit {
        Some(limit) => with_rate_limit(api, limit),
        None => api,
    };

    let cors = cors_layer(&state.cors_origins);
    let secure = state.secure_cookies;

    let app = Router::new()
        .route("/health", get(health::handle_health))
        .merge(api)
        .layer(CookieManagerLayer::new())
        .with_state(state);
    let app = with_security_headers(app, secure);
    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn with_security_headers(mut app: Router, secure: bool) -> Router {
    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ));
    }
    if secure {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS),
        ));
    }
    app
}

/// Credentialed CORS for an explicit origin list, or `None` if no usable
/// origin is configured.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| {
            // Credentials may not be combined with a wildcard origin.
            if origin == "*" {
                tracing::warn!("Ignoring wildcard CORS origin");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                    None
                }
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

fn with_rate_limit(routes: Router<AppState>, limit: RateLimitConfig) -> Router<AppState> {
    let Some(config) = GovernorConfigBuilder::default()
        .key_extractor(PeerIpKeyExtractor)
        .per_second(limit.per_second)
        .burst_size(limit.burst_size)
        .finish()
    else {
        tracing::warn!("Invalid rate limit {limit:?}, serving without one");
        return routes;
    };
    let config = Arc::new(config);

    let limiter = config.limiter().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(RATE_LIMIT_CLEANUP_INTERVAL).await;
            limiter.retain_recent();
        }
    });

    routes.layer(GovernorLayer { config })
}

/// Periodically drop expired sessions.
pub fn spawn_session_purge(sessions: SessionAuthority, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick fires immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {purged} expired sessions");
            }
        }
    })
}
