//! Integration tests for app discovery across sources.

mod common;

use common::FakeRegistryClient;
use grid_app_manager::{AppAggregator, HttpRegistryClient, RegistryClient};
use grid_core::{AppSource, GridError, MemoryConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SLOW: &str = "https://slow.test/apps.json";
const BROKEN: &str = "https://broken.test/apps.json";
const FAST: &str = "https://fast.test/apps.json";

fn config_with_registries(urls: &[&str]) -> MemoryConfig {
    MemoryConfig::new()
        .with_item("registries", json!(urls))
        .with_item("apps", json!([{ "name": "my-dapp", "url": "http://localhost:8080" }]))
}

#[tokio::test]
async fn test_sources_merge_in_order() {
    let registries = FakeRegistryClient::default()
        .serving(SLOW, Duration::from_millis(100), &["slow-a", "slow-b"])
        .serving(FAST, Duration::ZERO, &["fast-a"]);
    let aggregator = AppAggregator::new(
        Arc::new(config_with_registries(&[SLOW, FAST])),
        Arc::new(registries),
    );

    let apps = aggregator.list_all().await;
    let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["grid-ui", "my-dapp", "slow-a", "slow-b", "fast-a"]);

    let sources: Vec<AppSource> = apps.iter().map(|a| a.source).collect();
    assert_eq!(
        sources,
        vec![
            AppSource::Bundled,
            AppSource::UserConfig,
            AppSource::Registry,
            AppSource::Registry,
            AppSource::Registry,
        ]
    );
}

#[tokio::test]
async fn test_failing_registry_is_isolated() {
    let registries = FakeRegistryClient::default()
        .serving(SLOW, Duration::from_millis(20), &["slow-a"])
        .failing(BROKEN)
        .serving(FAST, Duration::ZERO, &["fast-a"]);
    let aggregator = AppAggregator::new(
        Arc::new(config_with_registries(&[SLOW, BROKEN, FAST])),
        Arc::new(registries),
    );

    let listing = aggregator.list_all_with_report().await;
    let names: Vec<&str> = listing.apps.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["grid-ui", "my-dapp", "slow-a", "fast-a"]);

    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].origin, BROKEN);
    assert!(matches!(
        listing.failures[0].error,
        GridError::SourceUnavailable { .. }
    ));
}

#[tokio::test]
async fn test_duplicates_are_kept() {
    let registries = FakeRegistryClient::default().serving(FAST, Duration::ZERO, &["my-dapp"]);
    let aggregator = AppAggregator::new(
        Arc::new(config_with_registries(&[FAST])),
        Arc::new(registries),
    );
    let apps = aggregator.list_all().await;
    assert_eq!(apps.iter().filter(|a| a.name == "my-dapp").count(), 2);
}

/// Serve one HTTP response on a local port and return its URL.
async fn serve_once(status: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/apps.json", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });
    url
}

#[tokio::test]
async fn test_http_registry_client() {
    let client = HttpRegistryClient::new().unwrap();

    let url = serve_once("200 OK", r#"{"apps": [{"name": "remote-dapp", "id": "r1"}]}"#).await;
    let document = client.fetch(&url).await.unwrap();
    assert_eq!(document.apps.len(), 1);
    assert_eq!(document.apps[0].id.as_deref(), Some("r1"));

    let url = serve_once("404 Not Found", "{}").await;
    assert!(matches!(
        client.fetch(&url).await,
        Err(GridError::SourceUnavailable { .. })
    ));

    let url = serve_once("200 OK", "<html>").await;
    assert!(matches!(
        client.fetch(&url).await,
        Err(GridError::SourceUnavailable { .. })
    ));
}
