//! Subscription Fetcher
//!
//! Time-bounded HTTP fetch of one subscription URL. The body is parsed as
//! JSON when the response says so, otherwise as YAML, and must carry a
//! proxies array.

use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::model::SubscriptionDocument;
use crate::Result;

/// HTTP client wrapper for subscription downloads.
pub struct Fetcher {
    http: reqwest::Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clashmix/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build subscription HTTP client")?;
        Ok(Self { http })
    }

    /// Fetch and parse one subscription document.
    pub async fn fetch_subscription(&self, url: &str) -> Result<SubscriptionDocument> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Subscription {} returned an error status", url))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        // A missing or non-array proxies field fails deserialization here,
        // which is the schema-validation failure the cache fallback catches.
        let document: SubscriptionDocument = if content_type.contains("application/json") {
            serde_json::from_str(&body).context("Invalid subscription: malformed JSON or missing proxies")?
        } else {
            serde_yaml::from_str(&body).context("Invalid subscription: malformed YAML or missing proxies")?
        };

        Ok(document)
    }
}
