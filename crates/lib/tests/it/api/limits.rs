use reqwest::StatusCode;
use tempfile::TempDir;

use shelfs::config::RateLimitConfig;

use crate::helpers::{TestServer, test_config};

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let dir = TempDir::new().unwrap();
    let config = shelfs::Config {
        rate_limit: Some(RateLimitConfig {
            per_second: 600,
            burst_size: 2,
        }),
        ..test_config(&dir)
    };
    let server = TestServer::start_with(dir, config).await;
    let client = server.client();

    for _ in 0..2 {
        let response = client.get(server.url("/auth/status")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = client.get(server.url("/auth/status")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Health checks are not limited.
    let response = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
