//! App Rule Catalog
//!
//! Maps application names to routing categories. The upstream app list comes
//! from the blackmatrix7 ios_rule_script repository; it is cached per scope
//! with an explicit lifecycle (`get` / `refresh` / `invalidate`) and a 24h
//! staleness threshold, then merged with per-scope category overrides.

pub mod defaults;

pub use defaults::{
    APP_GROUPS, LAN_GROUP, UNCATEGORIZED_GROUP_KEY, UNCATEGORIZED_GROUP_LABEL,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::model::AvailableApp;
use crate::Result;

const GITHUB_API_BASE: &str =
    "https://api.github.com/repos/blackmatrix7/ios_rule_script/contents/rule/Clash";
const RULE_URL_BASE: &str =
    "https://raw.githubusercontent.com/blackmatrix7/ios_rule_script/master/rule/Clash";

const REMOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppListCache {
    apps: Vec<String>,
    #[serde(with = "humantime_serde")]
    updated_at: SystemTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryData {
    #[serde(default)]
    overrides: HashMap<String, String>,
    #[serde(default)]
    custom_groups: Vec<String>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    updated_at: Option<SystemTime>,
}

/// Per-scope cache of available apps and category overrides.
pub struct AppCatalog {
    http: reqwest::Client,
    data_dir: PathBuf,
    ttl: Duration,
    api_base: String,
    apps: RwLock<HashMap<String, Vec<AvailableApp>>>,
    categories: RwLock<HashMap<String, CategoryData>>,
}

impl AppCatalog {
    pub fn new(data_dir: PathBuf, ttl: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REMOTE_FETCH_TIMEOUT)
            .user_agent(concat!("clashmix/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build catalog HTTP client")?;

        Ok(Self {
            http,
            data_dir,
            ttl,
            api_base: GITHUB_API_BASE.to_string(),
            apps: RwLock::new(HashMap::new()),
            categories: RwLock::new(HashMap::new()),
        })
    }

    /// Point the catalog at a different listing endpoint (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Remote rule-set URL for an app.
    pub fn rule_url(app_name: &str) -> String {
        format!("{}/{}/{}.yaml", RULE_URL_BASE, app_name, app_name)
    }

    /// Available apps for a scope with category overrides applied. Serves the
    /// memory cache, then a fresh-enough disk cache, then the remote listing.
    pub async fn get(&self, scope: &str) -> Result<Vec<AvailableApp>> {
        if let Some(apps) = self.apps.read().await.get(scope).cloned() {
            return self.apply_overrides(scope, apps).await;
        }
        let apps = self.load_or_fetch(scope).await?;
        self.apply_overrides(scope, apps).await
    }

    /// Force a remote refresh of the app list for a scope.
    pub async fn refresh(&self, scope: &str) -> Result<Vec<AvailableApp>> {
        let apps = self.fetch_remote(scope).await?;
        self.apply_overrides(scope, apps).await
    }

    /// Drop the in-memory app list for a scope; the next `get` reloads it.
    pub async fn invalidate(&self, scope: &str) {
        self.apps.write().await.remove(scope);
    }

    /// Per-scope category overrides (app name -> category label).
    pub async fn category_overrides(&self, scope: &str) -> Result<HashMap<String, String>> {
        Ok(self.category_data(scope).await.overrides)
    }

    /// Custom category names defined by this scope.
    pub async fn custom_groups(&self, scope: &str) -> Result<Vec<String>> {
        Ok(self.category_data(scope).await.custom_groups)
    }

    /// Persist new overrides (and optionally a new custom-group list) for a
    /// scope, keeping the memory cache in sync.
    pub async fn update_category_overrides(
        &self,
        scope: &str,
        overrides: HashMap<String, String>,
        custom_groups: Option<Vec<String>>,
    ) -> Result<()> {
        let existing = self.category_data(scope).await;
        let data = CategoryData {
            overrides,
            custom_groups: custom_groups.unwrap_or(existing.custom_groups),
            updated_at: Some(SystemTime::now()),
        };

        let path = self.categories_path(scope);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data directory for scope {}", scope))?;
        }
        let json = serde_json::to_string_pretty(&data)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write category overrides: {}", path.display()))?;

        self.categories
            .write()
            .await
            .insert(scope.to_string(), data);
        Ok(())
    }

    async fn category_data(&self, scope: &str) -> CategoryData {
        if let Some(data) = self.categories.read().await.get(scope).cloned() {
            return data;
        }
        let data = match tokio::fs::read_to_string(self.categories_path(scope)).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => CategoryData::default(),
        };
        self.categories
            .write()
            .await
            .insert(scope.to_string(), data.clone());
        data
    }

    async fn apply_overrides(
        &self,
        scope: &str,
        apps: Vec<AvailableApp>,
    ) -> Result<Vec<AvailableApp>> {
        let overrides = self.category_overrides(scope).await?;
        if overrides.is_empty() {
            return Ok(apps);
        }
        Ok(apps
            .into_iter()
            .map(|mut app| {
                if let Some(group) = overrides.get(&app.name) {
                    app.default_group = Some(group.clone());
                }
                app
            })
            .collect())
    }

    async fn load_or_fetch(&self, scope: &str) -> Result<Vec<AvailableApp>> {
        if let Ok(content) = tokio::fs::read_to_string(self.apps_cache_path(scope)).await {
            if let Ok(cache) = serde_json::from_str::<AppListCache>(&content) {
                let age = SystemTime::now()
                    .duration_since(cache.updated_at)
                    .unwrap_or(Duration::ZERO);
                if age < self.ttl {
                    let apps = Self::build_apps(cache.apps);
                    info!(
                        "Loaded {} catalog apps from cache (scope={})",
                        apps.len(),
                        scope
                    );
                    self.apps
                        .write()
                        .await
                        .insert(scope.to_string(), apps.clone());
                    return Ok(apps);
                }
            }
        }
        self.fetch_remote(scope).await
    }

    async fn fetch_remote(&self, scope: &str) -> Result<Vec<AvailableApp>> {
        info!("Fetching app rule listing from {}", self.api_base);
        let response = self
            .http
            .get(&self.api_base)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .context("App listing request failed")?
            .error_for_status()
            .context("App listing request returned an error status")?;

        let entries: Vec<DirectoryEntry> = response
            .json()
            .await
            .context("Failed to parse app listing response")?;

        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|e| e.entry_type == "dir")
            .map(|e| e.name)
            .collect();
        names.sort();
        names.dedup();
        info!("Fetched {} app rules (scope={})", names.len(), scope);

        // Best-effort cache write.
        let cache = AppListCache {
            apps: names.clone(),
            updated_at: SystemTime::now(),
        };
        let path = self.apps_cache_path(scope);
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        match serde_json::to_string_pretty(&cache) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&path, json).await {
                    warn!("Failed to save app list cache: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize app list cache: {}", e),
        }

        let apps = Self::build_apps(names);
        self.apps
            .write()
            .await
            .insert(scope.to_string(), apps.clone());
        Ok(apps)
    }

    fn build_apps(names: Vec<String>) -> Vec<AvailableApp> {
        names
            .into_iter()
            .map(|name| {
                let default_group = defaults::default_group(&name).map(str::to_string);
                AvailableApp {
                    name,
                    default_group,
                }
            })
            .collect()
    }

    fn apps_cache_path(&self, scope: &str) -> PathBuf {
        self.data_dir.join(scope).join("available-apps.json")
    }

    fn categories_path(&self, scope: &str) -> PathBuf {
        self.data_dir.join(scope).join("app-categories.json")
    }
}
