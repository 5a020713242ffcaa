//! Domain Model
//!
//! Schemes, subscription sources, proxies and the generated Clash output
//! document. Persisted records serialize in camelCase to stay compatible with
//! existing scheme files; the output document uses Clash's kebab-case keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// One routable proxy endpoint. Known attributes are typed; every other
/// protocol-specific field (cipher, password, ws-opts, ...) rides along in
/// `extra` and round-trips through merge and output serialization verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Proxy {
    pub name: String,
    #[serde(rename = "type")]
    pub proxy_type: String,
    pub server: String,
    pub port: u16,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Proxy {
    /// Minimal validity check for inline custom proxies.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.proxy_type.trim().is_empty()
            && !self.server.trim().is_empty()
            && self.port != 0
    }
}

/// A parsed subscription document. Only the proxy list matters to the
/// aggregator; any upstream groups/rules are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionDocument {
    pub proxies: Vec<Proxy>,
}

/// Where a source's proxies come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Custom,
}

/// Last fetch outcome recorded on a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Error,
    #[default]
    Pending,
}

/// Severity tag on a fetch-outcome log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeLevel {
    Success,
    Cache,
    Error,
}

/// One entry in a source's rolling fetch-outcome log.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutcomeEntry {
    #[serde(with = "humantime_serde")]
    pub time: SystemTime,
    pub level: OutcomeLevel,
    pub message: String,
}

/// One proxy source within a scheme: either a remote subscription URL or an
/// inline custom proxy, never both.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_proxy: Option<Proxy>,
    #[serde(default)]
    pub status: FetchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_fetch: Option<SystemTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_log: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_logs: Vec<OutcomeEntry>,
}

impl SourceConfig {
    /// New remote-subscription source with a fresh id and pending status.
    pub fn new_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            enabled: true,
            source_type: SourceType::Url,
            url: Some(url.into()),
            custom_proxy: None,
            status: FetchStatus::Pending,
            error: None,
            last_fetch: None,
            update_log: None,
            update_logs: Vec::new(),
        }
    }

    /// New inline custom-proxy source.
    pub fn new_custom(name: impl Into<String>, proxy: Proxy) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            enabled: true,
            source_type: SourceType::Custom,
            url: None,
            custom_proxy: Some(proxy),
            status: FetchStatus::Pending,
            error: None,
            last_fetch: None,
            update_log: None,
            update_logs: Vec::new(),
        }
    }
}

/// Deduplication mode used while merging source proxy lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Deduplication {
    #[default]
    ByName,
    ByServer,
    None,
}

/// How a name/dedup conflict between two proxies is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    #[default]
    Rename,
    Skip,
    Override,
}

/// Ordering of the helper groups inside each region selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionGroupMode {
    #[default]
    Select,
    UrlTest,
    Fallback,
}

/// App-level or category-level routing intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteRuleKind {
    App,
    Category,
}

/// Routes one application (or a whole category of applications) to a named
/// policy group.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRouteRule {
    pub app_name: String,
    pub group: String,
    #[serde(rename = "type")]
    pub kind: RouteRuleKind,
}

/// Aggregation policy for a scheme.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRule {
    #[serde(default)]
    pub deduplication: Deduplication,
    #[serde(default)]
    pub name_conflict_resolve: ConflictResolution,
    #[serde(default = "default_true")]
    pub enabled_only: bool,
    #[serde(default)]
    pub region_grouping: bool,
    #[serde(default)]
    pub region_group_mode: RegionGroupMode,
    #[serde(default)]
    pub app_rules: Vec<AppRouteRule>,
}

fn default_true() -> bool {
    true
}

impl Default for AggregateRule {
    fn default() -> Self {
        Self {
            deduplication: Deduplication::default(),
            name_conflict_resolve: ConflictResolution::default(),
            enabled_only: true,
            region_grouping: false,
            region_group_mode: RegionGroupMode::default(),
            app_rules: Vec::new(),
        }
    }
}

/// A named bundle of proxy sources plus its aggregation policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    #[serde(default)]
    pub configs: Vec<SourceConfig>,
    #[serde(default)]
    pub rules: AggregateRule,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<SystemTime>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<SystemTime>,
}

/// An application known to the rule catalog, with its effective category.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableApp {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_group: Option<String>,
}

/// One generated policy group in the output document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub proxies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Probe endpoint shared by every latency-sensitive group.
pub const LATENCY_TEST_URL: &str = "http://www.gstatic.com/generate_204";
/// Probe interval in seconds for url-test/fallback groups.
pub const LATENCY_TEST_INTERVAL: u64 = 300;

impl ProxyGroup {
    pub fn select(name: impl Into<String>, proxies: Vec<String>) -> Self {
        Self {
            name: name.into(),
            group_type: "select".to_string(),
            proxies,
            url: None,
            interval: None,
            hidden: None,
        }
    }

    pub fn url_test(name: impl Into<String>, proxies: Vec<String>, hidden: bool) -> Self {
        Self {
            name: name.into(),
            group_type: "url-test".to_string(),
            proxies,
            url: Some(LATENCY_TEST_URL.to_string()),
            interval: Some(LATENCY_TEST_INTERVAL),
            hidden: hidden.then_some(true),
        }
    }

    pub fn fallback(name: impl Into<String>, proxies: Vec<String>, hidden: bool) -> Self {
        Self {
            name: name.into(),
            group_type: "fallback".to_string(),
            proxies,
            url: Some(LATENCY_TEST_URL.to_string()),
            interval: Some(LATENCY_TEST_INTERVAL),
            hidden: hidden.then_some(true),
        }
    }
}

/// One remote rule-set reference in the output document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub behavior: String,
    pub url: String,
    pub path: String,
    pub interval: u64,
}

/// Reduced projection of the output document for UI display.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodesView {
    pub proxies: Vec<Proxy>,
    pub groups: Vec<ProxyGroup>,
}

/// The assembled Clash configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClashConfig {
    #[serde(rename = "mixed-port")]
    pub mixed_port: u16,
    #[serde(rename = "allow-lan")]
    pub allow_lan: bool,
    #[serde(rename = "bind-address")]
    pub bind_address: String,
    pub mode: String,
    #[serde(rename = "log-level")]
    pub log_level: String,
    pub ipv6: bool,
    #[serde(rename = "external-controller")]
    pub external_controller: String,
    pub proxies: Vec<Proxy>,
    #[serde(rename = "proxy-groups")]
    pub proxy_groups: Vec<ProxyGroup>,
    #[serde(rename = "rule-providers", skip_serializing_if = "Option::is_none")]
    pub rule_providers: Option<BTreeMap<String, RuleProvider>>,
    pub rules: Vec<String>,
}

impl ClashConfig {
    /// Reduced `{proxies, groups}` projection for UI display.
    pub fn nodes_view(&self) -> NodesView {
        NodesView {
            proxies: self.proxies.clone(),
            groups: self.proxy_groups.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_extra_fields_round_trip() {
        let yaml = r#"
name: HK-01
type: ss
server: 1.1.1.1
port: 443
cipher: aes-256-gcm
password: secret
udp: true
"#;
        let proxy: Proxy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(proxy.name, "HK-01");
        assert_eq!(proxy.port, 443);
        assert_eq!(
            proxy.extra.get("cipher"),
            Some(&serde_yaml::Value::from("aes-256-gcm"))
        );

        let out = serde_yaml::to_string(&proxy).unwrap();
        let reparsed: Proxy = serde_yaml::from_str(&out).unwrap();
        assert_eq!(proxy, reparsed);
    }

    #[test]
    fn invalid_inline_proxy_is_rejected() {
        let proxy = Proxy {
            name: "node".to_string(),
            proxy_type: "ss".to_string(),
            server: "1.2.3.4".to_string(),
            port: 0,
            extra: BTreeMap::new(),
        };
        assert!(!proxy.is_valid());
    }

    #[test]
    fn aggregate_rule_defaults() {
        let rule: AggregateRule = serde_json::from_str("{}").unwrap();
        assert_eq!(rule.deduplication, Deduplication::ByName);
        assert_eq!(rule.name_conflict_resolve, ConflictResolution::Rename);
        assert!(rule.enabled_only);
        assert!(!rule.region_grouping);
    }

    #[test]
    fn region_group_mode_uses_kebab_case() {
        let mode: RegionGroupMode = serde_json::from_str("\"url-test\"").unwrap();
        assert_eq!(mode, RegionGroupMode::UrlTest);
    }
}
