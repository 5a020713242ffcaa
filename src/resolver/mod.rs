//! Source Resolver
//!
//! Resolves one scheme source to a subscription document: inline custom
//! proxies are synthesized directly, remote URLs are fetched with a short
//! timeout and fall back to the last-known-good snapshot on failure.

pub mod cache;
pub mod fetch;

pub use cache::SnapshotCache;
pub use fetch::Fetcher;

use tracing::warn;

use crate::model::{SourceConfig, SourceType, SubscriptionDocument};
use crate::settings::Settings;
use crate::Result;

/// Outcome of resolving one source. A cache fallback is a success that still
/// carries the original fetch error for observability.
#[derive(Debug)]
pub struct Resolution {
    pub document: Option<SubscriptionDocument>,
    pub from_cache: bool,
    pub error: Option<String>,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        self.document.is_some()
    }

    fn live(document: SubscriptionDocument) -> Self {
        Self {
            document: Some(document),
            from_cache: false,
            error: None,
        }
    }

    fn cached(document: SubscriptionDocument, original_error: String) -> Self {
        Self {
            document: Some(document),
            from_cache: true,
            error: Some(original_error),
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            document: None,
            from_cache: false,
            error: Some(error.into()),
        }
    }
}

pub struct Resolver {
    fetcher: Fetcher,
    cache: SnapshotCache,
}

impl Resolver {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(settings.fetch_timeout)?,
            cache: SnapshotCache::new(settings.data_dir.clone()),
        })
    }

    /// Resolve one source for a scope. Never panics; all failure modes end
    /// up as a `Resolution` with an error message.
    pub async fn resolve(&self, scope: &str, source: &SourceConfig) -> Resolution {
        match source.source_type {
            SourceType::Custom => Self::resolve_custom(source),
            SourceType::Url => self.resolve_url(scope, source).await,
        }
    }

    /// Inline sources never touch the network or the cache.
    fn resolve_custom(source: &SourceConfig) -> Resolution {
        let Some(proxy) = &source.custom_proxy else {
            return Resolution::failure("Custom source has no inline proxy");
        };
        if !proxy.is_valid() {
            return Resolution::failure(
                "Inline proxy is missing a name, type, server or port",
            );
        }
        Resolution::live(SubscriptionDocument {
            proxies: vec![proxy.clone()],
        })
    }

    async fn resolve_url(&self, scope: &str, source: &SourceConfig) -> Resolution {
        let url = source.url.as_deref().unwrap_or("").trim().to_string();
        if url.is_empty() {
            return Resolution::failure("Subscription URL is empty");
        }

        match self.fetcher.fetch_subscription(&url).await {
            Ok(document) => {
                self.cache.store(scope, &source.id, &document).await;
                Resolution::live(document)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                match self.cache.load(scope, &source.id).await {
                    Some(document) => {
                        warn!(
                            "Using cached snapshot for {} ({}) after fetch failure: {}",
                            source.name, source.id, message
                        );
                        Resolution::cached(document, message)
                    }
                    None => Resolution::failure(message),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Proxy;
    use std::collections::BTreeMap;

    fn custom_source(proxy: Option<Proxy>) -> SourceConfig {
        let mut source = SourceConfig::new_custom(
            "inline",
            Proxy {
                name: "placeholder".to_string(),
                proxy_type: "ss".to_string(),
                server: "1.1.1.1".to_string(),
                port: 443,
                extra: BTreeMap::new(),
            },
        );
        source.custom_proxy = proxy;
        source
    }

    #[test]
    fn custom_source_synthesizes_single_proxy_document() {
        let proxy = Proxy {
            name: "my-node".to_string(),
            proxy_type: "trojan".to_string(),
            server: "example.com".to_string(),
            port: 443,
            extra: BTreeMap::new(),
        };
        let resolution = Resolver::resolve_custom(&custom_source(Some(proxy)));
        assert!(resolution.is_success());
        assert!(!resolution.from_cache);
        let doc = resolution.document.unwrap();
        assert_eq!(doc.proxies.len(), 1);
        assert_eq!(doc.proxies[0].name, "my-node");
    }

    #[test]
    fn custom_source_without_proxy_fails() {
        let resolution = Resolver::resolve_custom(&custom_source(None));
        assert!(!resolution.is_success());
        assert!(resolution.error.is_some());
    }

    #[test]
    fn custom_source_with_invalid_proxy_fails_validation() {
        // Scenario: missing port. No network call, no cache lookup.
        let proxy = Proxy {
            name: "broken".to_string(),
            proxy_type: "ss".to_string(),
            server: "example.com".to_string(),
            port: 0,
            extra: BTreeMap::new(),
        };
        let resolution = Resolver::resolve_custom(&custom_source(Some(proxy)));
        assert!(!resolution.is_success());
    }
}
