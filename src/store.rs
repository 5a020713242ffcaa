//! Scheme Store
//!
//! JSON-file persistence for schemes, one file per scope, with a
//! single-writer-per-scope guarantee: every mutation runs through
//! `with_exclusive`, which serializes load-mutate-save under a per-scope
//! async mutex. Saves go through a temp file plus rename so concurrent
//! readers observe either the pre- or post-write state, never a torn file.

use anyhow::{bail, Context};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::info;

use crate::model::{Scheme, SourceConfig};
use crate::Result;

pub struct SchemeStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SchemeStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run one exclusive load-mutate-save cycle for a scope. At most one
    /// mutation per scope is in flight at a time; queued callers run in
    /// arrival order.
    pub async fn with_exclusive<T>(
        &self,
        scope: &str,
        f: impl FnOnce(&mut Vec<Scheme>) -> Result<T>,
    ) -> Result<T> {
        let lock = self.scope_lock(scope).await;
        let _guard = lock.lock().await;

        let mut schemes = self.load_schemes(scope).await?;
        let result = f(&mut schemes)?;
        self.save_schemes(scope, &schemes).await?;
        Ok(result)
    }

    /// All schemes in a scope. Lock-free: file replacement is atomic.
    pub async fn list_schemes(&self, scope: &str) -> Result<Vec<Scheme>> {
        self.load_schemes(scope).await
    }

    pub async fn get_scheme(&self, scope: &str, name: &str) -> Result<Option<Scheme>> {
        let schemes = self.load_schemes(scope).await?;
        Ok(schemes.into_iter().find(|s| s.name == name))
    }

    pub async fn create_scheme(&self, scope: &str, mut scheme: Scheme) -> Result<Scheme> {
        self.with_exclusive(scope, move |schemes| {
            if schemes.iter().any(|s| s.name == scheme.name) {
                bail!("Scheme '{}' already exists", scheme.name);
            }
            let now = SystemTime::now();
            scheme.created_at = Some(now);
            scheme.updated_at = Some(now);
            schemes.push(scheme.clone());
            Ok(scheme)
        })
        .await
    }

    pub async fn update_scheme(
        &self,
        scope: &str,
        name: &str,
        f: impl FnOnce(&mut Scheme),
    ) -> Result<Scheme> {
        let name = name.to_string();
        self.with_exclusive(scope, move |schemes| {
            let Some(scheme) = schemes.iter_mut().find(|s| s.name == name) else {
                bail!("Scheme '{}' does not exist", name);
            };
            f(scheme);
            scheme.updated_at = Some(SystemTime::now());
            Ok(scheme.clone())
        })
        .await
    }

    pub async fn delete_scheme(&self, scope: &str, name: &str) -> Result<()> {
        let name = name.to_string();
        self.with_exclusive(scope, move |schemes| {
            let Some(index) = schemes.iter().position(|s| s.name == name) else {
                bail!("Scheme '{}' does not exist", name);
            };
            schemes.remove(index);
            Ok(())
        })
        .await
    }

    /// Write refreshed fetch outcomes back onto a scheme's sources, matched
    /// by source id. Goes through the same exclusive queue as every other
    /// write so racing refreshes of one scope cannot lose updates.
    pub async fn apply_source_outcomes(
        &self,
        scope: &str,
        scheme_name: &str,
        updates: &[SourceConfig],
    ) -> Result<()> {
        let scheme_name = scheme_name.to_string();
        let updates = updates.to_vec();
        self.with_exclusive(scope, move |schemes| {
            let Some(scheme) = schemes.iter_mut().find(|s| s.name == scheme_name) else {
                bail!("Scheme '{}' does not exist", scheme_name);
            };
            for update in updates {
                if let Some(source) = scheme.configs.iter_mut().find(|c| c.id == update.id) {
                    *source = update;
                }
            }
            scheme.updated_at = Some(SystemTime::now());
            Ok(())
        })
        .await
    }

    async fn scope_lock(&self, scope: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(scope.to_string()).or_default())
    }

    async fn load_schemes(&self, scope: &str) -> Result<Vec<Scheme>> {
        let path = self.schemes_path(scope);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse scheme file: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read scheme file: {}", path.display()))
            }
        }
    }

    async fn save_schemes(&self, scope: &str, schemes: &[Scheme]) -> Result<()> {
        let path = self.schemes_path(scope);
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create data directory for {}", scope))?;
                info!("Created data directory for scope {}", scope);
            }
        }

        let json = serde_json::to_string_pretty(schemes)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write scheme file: {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace scheme file: {}", path.display()))?;
        Ok(())
    }

    fn schemes_path(&self, scope: &str) -> PathBuf {
        self.root.join(scope).join("schemes.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AggregateRule;

    fn scheme(name: &str) -> Scheme {
        Scheme {
            name: name.to_string(),
            description: String::new(),
            enabled: true,
            configs: vec![SourceConfig::new_url("sub", "https://example.com/sub")],
            rules: AggregateRule::default(),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemeStore::new(dir.path().to_path_buf());

        store.create_scheme("alice", scheme("home")).await.unwrap();
        let loaded = store.get_scheme("alice", "home").await.unwrap().unwrap();
        assert_eq!(loaded.name, "home");
        assert!(loaded.created_at.is_some());

        // Scopes are isolated.
        assert!(store.get_scheme("bob", "home").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemeStore::new(dir.path().to_path_buf());

        store.create_scheme("alice", scheme("home")).await.unwrap();
        assert!(store.create_scheme("alice", scheme("home")).await.is_err());
    }

    #[tokio::test]
    async fn outcomes_are_matched_by_source_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemeStore::new(dir.path().to_path_buf());

        let created = store.create_scheme("alice", scheme("home")).await.unwrap();
        let mut updated = created.configs[0].clone();
        updated.error = Some("boom".to_string());
        store
            .apply_source_outcomes("alice", "home", &[updated])
            .await
            .unwrap();

        let loaded = store.get_scheme("alice", "home").await.unwrap().unwrap();
        assert_eq!(loaded.configs[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_scope_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SchemeStore::new(dir.path().to_path_buf()));

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create_scheme("alice", scheme(&format!("scheme-{}", i)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list_schemes("alice").await.unwrap().len(), 10);
    }
}
