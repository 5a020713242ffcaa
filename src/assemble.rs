//! Aggregate Assembler
//!
//! Resolves every enabled source of a scheme concurrently, merges the proxy
//! lists in config order, synthesizes selector/auto-test/failover groups and
//! emits the final Clash document. This stage never fails: empty inputs
//! degrade to empty lists.

use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::catalog::{AppCatalog, LAN_GROUP};
use crate::compiler::{compile_app_rules, CompiledRules};
use crate::merge::merge_proxies;
use crate::model::{
    AggregateRule, ClashConfig, Proxy, ProxyGroup, RegionGroupMode, Scheme, SourceConfig,
};
use crate::outcome::apply_outcome;
use crate::region::{classify_by_region, RegionBuckets, OTHER_REGION_GROUP};
use crate::resolver::{Resolution, Resolver};
use crate::settings::Settings;
use crate::Result;

/// Top-level selector offered to the client.
pub const PRIMARY_SELECTOR_GROUP: &str = "🔰 节点选择";
/// Latency-based auto-select group spanning all proxies.
pub const AUTO_SELECT_GROUP: &str = "♻️ 自动选择";

/// Aggregation result: the assembled document plus the resolved sources with
/// their refreshed fetch outcomes, for the caller to persist.
#[derive(Debug)]
pub struct AggregateOutcome {
    pub config: ClashConfig,
    pub sources: Vec<SourceConfig>,
}

pub struct Aggregator {
    resolver: Arc<Resolver>,
    catalog: Arc<AppCatalog>,
}

impl Aggregator {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            resolver: Arc::new(Resolver::new(settings)?),
            catalog: Arc::new(AppCatalog::new(
                settings.data_dir.clone(),
                settings.catalog_ttl,
            )?),
        })
    }

    /// Build an aggregator around existing collaborators.
    pub fn with_parts(resolver: Arc<Resolver>, catalog: Arc<AppCatalog>) -> Self {
        Self { resolver, catalog }
    }

    /// Aggregate one scheme for a scope.
    ///
    /// Sources resolve concurrently (one task each); the merge then runs in
    /// scheme config order so rename disambiguation is deterministic. A
    /// failed source only omits its proxies, it never aborts the whole
    /// aggregation.
    pub async fn aggregate(&self, scope: &str, scheme: &Scheme) -> Result<AggregateOutcome> {
        let targets: Vec<SourceConfig> = if scheme.rules.enabled_only {
            scheme.configs.iter().filter(|c| c.enabled).cloned().collect()
        } else {
            scheme.configs.clone()
        };

        let handles: Vec<_> = targets
            .iter()
            .map(|source| {
                let resolver = Arc::clone(&self.resolver);
                let scope = scope.to_string();
                let source = source.clone();
                tokio::spawn(async move { resolver.resolve(&scope, &source).await })
            })
            .collect();

        let mut resolutions = Vec::with_capacity(handles.len());
        for handle in handles {
            let resolution = match handle.await {
                Ok(resolution) => resolution,
                Err(e) => Resolution {
                    document: None,
                    from_cache: false,
                    error: Some(format!("Resolver task failed: {}", e)),
                },
            };
            resolutions.push(resolution);
        }

        let mut all_proxies: Vec<Proxy> = Vec::new();
        let now = SystemTime::now();
        let mut updated_sources = targets;
        for (source, resolution) in updated_sources.iter_mut().zip(resolutions.iter()) {
            if let Some(document) = &resolution.document {
                merge_proxies(
                    &mut all_proxies,
                    document.proxies.clone(),
                    &scheme.rules,
                    &source.name,
                );
            } else {
                debug!(
                    "Omitting source '{}' from merge: {}",
                    source.name,
                    resolution.error.as_deref().unwrap_or("unknown error")
                );
            }
            apply_outcome(source, resolution, now);
        }

        let compiled = self.compile_rules(scope, scheme).await;

        let mut rules = compiled.entries.clone();
        rules.push("MATCH,DIRECT".to_string());

        let config = ClashConfig {
            mixed_port: 7890,
            allow_lan: false,
            bind_address: "*".to_string(),
            mode: "rule".to_string(),
            log_level: "info".to_string(),
            ipv6: false,
            external_controller: "127.0.0.1:9090".to_string(),
            proxy_groups: build_proxy_groups(&all_proxies, &scheme.rules, &compiled.group_names),
            rule_providers: (!compiled.providers.is_empty()).then_some(compiled.providers),
            proxies: all_proxies,
            rules,
        };

        info!(
            "Aggregated scheme '{}': {} proxies, {} groups, {} rules",
            scheme.name,
            config.proxies.len(),
            config.proxy_groups.len(),
            config.rules.len()
        );

        Ok(AggregateOutcome {
            config,
            sources: updated_sources,
        })
    }

    /// App-rule compilation degrades to an empty expansion when the catalog
    /// is unavailable; app-level rules still compile without it.
    async fn compile_rules(&self, scope: &str, scheme: &Scheme) -> CompiledRules {
        if scheme.rules.app_rules.is_empty() {
            return CompiledRules::default();
        }
        let apps = match self.catalog.get(scope).await {
            Ok(apps) => apps,
            Err(e) => {
                warn!("App catalog unavailable, expanding against empty list: {:#}", e);
                Vec::new()
            }
        };
        compile_app_rules(&scheme.rules.app_rules, &apps)
    }
}

/// Region selector plus its two hidden helper groups.
fn region_group_triple(
    group_name: &str,
    members: &[String],
    mode: RegionGroupMode,
) -> [ProxyGroup; 3] {
    let url_test_name = format!("{} · URLTest", group_name);
    let fallback_name = format!("{} · Failover", group_name);

    let mut parent_proxies: Vec<String> = match mode {
        RegionGroupMode::UrlTest => vec![url_test_name.clone(), fallback_name.clone()],
        RegionGroupMode::Fallback => vec![fallback_name.clone(), url_test_name.clone()],
        RegionGroupMode::Select => Vec::new(),
    };
    match mode {
        RegionGroupMode::Select => {
            parent_proxies.extend(members.iter().cloned());
            parent_proxies.push(url_test_name.clone());
            parent_proxies.push(fallback_name.clone());
        }
        _ => parent_proxies.extend(members.iter().cloned()),
    }

    [
        ProxyGroup::url_test(url_test_name, members.to_vec(), true),
        ProxyGroup::fallback(fallback_name, members.to_vec(), true),
        ProxyGroup::select(group_name, parent_proxies),
    ]
}

fn region_buckets_with_other(buckets: &RegionBuckets) -> Vec<(String, Vec<String>)> {
    let mut all: Vec<(String, Vec<String>)> = buckets.groups.clone();
    if !buckets.unmatched.is_empty() {
        all.push((OTHER_REGION_GROUP.to_string(), buckets.unmatched.clone()));
    }
    all
}

/// Synthesize the full proxy-group list for the output document.
pub fn build_proxy_groups(
    proxies: &[Proxy],
    rule: &AggregateRule,
    group_names: &[String],
) -> Vec<ProxyGroup> {
    let proxy_names: Vec<String> = proxies.iter().map(|p| p.name.clone()).collect();

    let mut region_proxy_groups: Vec<ProxyGroup> = Vec::new();
    let mut region_group_names: Vec<String> = Vec::new();
    if rule.region_grouping {
        let buckets = classify_by_region(proxies);
        for (group_name, members) in region_buckets_with_other(&buckets) {
            region_group_names.push(group_name.clone());
            region_proxy_groups.extend(region_group_triple(
                &group_name,
                &members,
                rule.region_group_mode,
            ));
        }
    }

    let primary_members: Vec<String> = {
        let mut members = vec![AUTO_SELECT_GROUP.to_string(), "DIRECT".to_string()];
        if rule.region_grouping {
            members.extend(region_group_names.iter().cloned());
        } else {
            members.extend(proxy_names.iter().cloned());
        }
        members
    };

    let mut groups = vec![
        ProxyGroup::select(PRIMARY_SELECTOR_GROUP, primary_members),
        ProxyGroup::url_test(AUTO_SELECT_GROUP, proxy_names.clone(), false),
    ];

    let app_groups_to_create: Vec<&String> = group_names
        .iter()
        .filter(|name| name.as_str() != "DIRECT" && name.as_str() != "REJECT")
        .collect();
    if !app_groups_to_create.is_empty() {
        let mut app_group_proxies = vec![
            PRIMARY_SELECTOR_GROUP.to_string(),
            "DIRECT".to_string(),
            "REJECT".to_string(),
            AUTO_SELECT_GROUP.to_string(),
        ];
        app_group_proxies.extend(region_group_names.iter().cloned());

        for group_name in app_groups_to_create {
            if group_name == LAN_GROUP {
                // LAN routing benefits from per-node choice, so this group
                // bypasses the selector abstraction.
                let mut lan_proxies = vec![
                    "DIRECT".to_string(),
                    "REJECT".to_string(),
                    AUTO_SELECT_GROUP.to_string(),
                ];
                lan_proxies.extend(proxy_names.iter().cloned());
                groups.push(ProxyGroup::select(group_name.clone(), lan_proxies));
            } else {
                groups.push(ProxyGroup::select(group_name.clone(), app_group_proxies.clone()));
            }
        }
    }

    groups.extend(region_proxy_groups);
    groups
}
