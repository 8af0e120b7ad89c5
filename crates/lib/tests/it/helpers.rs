use std::{net::SocketAddr, sync::Arc};

use tempfile::TempDir;

use shelfs::{
    Config, FixedClock,
    api::{self, AppState},
    cipher::CredentialCipher,
    files::FileRegistry,
    ledger::{AccountLedger, InMemory, LedgerBackend},
    namespace::FileNamespace,
};

/// Passphrase used by every test server.
pub const TEST_SECRET: &str = "integration-test-secret";

/// Upload cap for test servers, small enough to exceed cheaply.
pub const TEST_MAX_UPLOAD: u64 = 1024;

/// A cipher with a fixed raw key, skipping key derivation.
pub fn test_cipher() -> CredentialCipher {
    CredentialCipher::from_key_bytes([7u8; 32]).expect("32-byte key")
}

pub fn test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::default())
}

/// A ledger over an in-memory blob, returning the backend for inspection.
pub fn memory_ledger() -> (AccountLedger, Arc<InMemory>) {
    memory_ledger_with(InMemory::new())
}

pub fn memory_ledger_with(backend: InMemory) -> (AccountLedger, Arc<InMemory>) {
    let backend = Arc::new(backend);
    let ledger = AccountLedger::new(
        backend.clone() as Arc<dyn LedgerBackend>,
        test_cipher(),
        test_clock(),
    );
    (ledger, backend)
}

/// A file registry rooted in a fresh temporary directory.
pub async fn test_registry() -> (FileRegistry, Arc<FixedClock>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let clock = test_clock();
    let namespace = FileNamespace::open(dir.path().join("storage"))
        .await
        .expect("open namespace");
    (FileRegistry::new(namespace, clock.clone()), clock, dir)
}

/// Configuration for a test server storing under `dir`.
pub fn test_config(dir: &TempDir) -> Config {
    Config {
        max_upload_bytes: TEST_MAX_UPLOAD,
        rate_limit: None,
        ..Config::new(dir.path(), TEST_SECRET)
    }
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let config = test_config(&dir);
        Self::start_with(dir, config).await
    }

    pub async fn start_with(dir: TempDir, config: Config) -> Self {
        let clock = test_clock();
        let state = AppState::open_with_clock(&config, clock.clone())
            .await
            .expect("open app state");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = api::router(state.clone());
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("server");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            clock,
            dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client with its own cookie jar.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("client")
    }

    /// Sign up `username` and return a client holding their session.
    pub async fn signed_up(&self, username: &str) -> reqwest::Client {
        let client = self.client();
        let response = client
            .post(self.url("/auth/signup"))
            .json(&serde_json::json!({ "username": username, "password": "password123" }))
            .send()
            .await
            .expect("signup request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        client
    }

    pub async fn upload(
        &self,
        client: &reqwest::Client,
        name: &str,
        content: Vec<u8>,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(content).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        client
            .post(self.url("/files/upload"))
            .multipart(form)
            .send()
            .await
            .expect("upload request")
    }

    pub async fn list(&self, client: &reqwest::Client) -> Vec<serde_json::Value> {
        let response = client
            .get(self.url("/files/list"))
            .send()
            .await
            .expect("list request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.expect("list body");
        body["files"].as_array().cloned().unwrap_or_default()
    }
}
