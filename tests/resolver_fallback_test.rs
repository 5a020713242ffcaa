//! Tests for subscription resolution and the stale-snapshot fallback

use std::path::Path;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clashmix::model::{SourceConfig, SourceType};
use clashmix::{Resolver, Settings};

const SUBSCRIPTION_YAML: &str = "
proxies:
  - name: HK-01
    type: ss
    server: 1.1.1.1
    port: 443
    cipher: aes-256-gcm
    password: secret
";

fn test_settings(data_dir: &Path) -> Settings {
    Settings {
        data_dir: data_dir.to_path_buf(),
        fetch_timeout: Duration::from_secs(1),
        ..Settings::default()
    }
}

fn url_source(url: String) -> SourceConfig {
    SourceConfig::new_url("remote-sub", url)
}

#[tokio::test]
async fn live_fetch_parses_yaml_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUBSCRIPTION_YAML))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let source = url_source(format!("{}/sub", server.uri()));

    let resolution = resolver.resolve("alice", &source).await;
    assert!(resolution.is_success());
    assert!(!resolution.from_cache);
    assert!(resolution.error.is_none());

    let doc = resolution.document.unwrap();
    assert_eq!(doc.proxies.len(), 1);
    assert_eq!(doc.proxies[0].name, "HK-01");
    // Protocol-specific fields survive parsing.
    assert!(doc.proxies[0].extra.contains_key("cipher"));
}

#[tokio::test]
async fn json_content_type_switches_parser() {
    let server = MockServer::start().await;
    let body = r#"{"proxies":[{"name":"US-01","type":"trojan","server":"2.2.2.2","port":8443}]}"#;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let source = url_source(format!("{}/sub", server.uri()));

    let resolution = resolver.resolve("alice", &source).await;
    assert!(resolution.is_success());
    assert_eq!(resolution.document.unwrap().proxies[0].name, "US-01");
}

#[tokio::test]
async fn fetch_failure_falls_back_to_cached_snapshot() {
    // First fetch succeeds and warms the cache, then the upstream breaks.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUBSCRIPTION_YAML))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let source = url_source(format!("{}/sub", server.uri()));

    let first = resolver.resolve("alice", &source).await;
    assert!(first.is_success());
    assert!(!first.from_cache);

    let second = resolver.resolve("alice", &source).await;
    assert!(second.is_success());
    assert!(second.from_cache);
    // The original fetch error stays attached for observability.
    let error = second.error.unwrap();
    assert!(error.contains("502"), "unexpected error: {}", error);
    assert_eq!(second.document.unwrap().proxies[0].name, "HK-01");
}

#[tokio::test]
async fn fetch_failure_without_cache_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let source = url_source(format!("{}/sub", server.uri()));

    let resolution = resolver.resolve("alice", &source).await;
    assert!(!resolution.is_success());
    assert!(!resolution.from_cache);
    assert!(resolution.error.is_some());
}

#[tokio::test]
async fn missing_proxies_array_is_a_schema_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rules: []\n"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let source = url_source(format!("{}/sub", server.uri()));

    let resolution = resolver.resolve("alice", &source).await;
    assert!(!resolution.is_success());
    assert!(resolution.error.unwrap().contains("proxies"));
}

#[tokio::test]
async fn slow_upstream_times_out_and_uses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUBSCRIPTION_YAML))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SUBSCRIPTION_YAML)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let source = url_source(format!("{}/sub", server.uri()));

    let first = resolver.resolve("alice", &source).await;
    assert!(first.is_success());

    // The 1s timeout fires before the 3s delay; timeout is treated like any
    // other fetch failure and served from cache.
    let second = resolver.resolve("alice", &source).await;
    assert!(second.is_success());
    assert!(second.from_cache);
    assert!(second.error.is_some());
}

#[tokio::test]
async fn empty_url_fails_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(&test_settings(dir.path())).unwrap();
    let mut source = url_source("https://example.com/sub".to_string());
    source.url = Some("   ".to_string());
    assert_eq!(source.source_type, SourceType::Url);

    let resolution = resolver.resolve("alice", &source).await;
    assert!(!resolution.is_success());
    assert!(resolution.error.unwrap().contains("empty"));
}
