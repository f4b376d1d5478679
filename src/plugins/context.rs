//! Context sharing between plugins
//!
//! Plugins may declare context keys they produce and consume. The manager
//! collects manifests (self-declared by inlined plugins, obtained by running
//! `<binary> manifest` for external ones), answers which values are currently
//! available, and persists what it learned in `context.json` next to the
//! config file so external binaries are not asked again while their path is
//! unchanged.
//!
//! Nothing here is allowed to fail an invocation: a broken cache reads as
//! empty, a plugin without a usable manifest has no manifest, and a cache
//! that cannot be written is only logged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::PluginCatalog;
use super::types::{ContextData, Location, Manifest, PluginDescriptor};

/// File name of the cache, placed in the config directory.
pub const CONTEXT_CACHE_FILE: &str = "context.json";

/// Upper bound for `<binary> manifest`.
pub const MANIFEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Argument asking an external plugin for its manifest.
const MANIFEST_ARG: &str = "manifest";

/// Persisted manifest knowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCache {
    /// Plugin name → manifest.
    #[serde(default)]
    pub manifests: BTreeMap<String, Manifest>,
    /// Context key → names of plugins producing it.
    #[serde(default)]
    pub producers: BTreeMap<String, Vec<String>>,
    /// Context key → names of plugins consuming it.
    #[serde(default)]
    pub consumers: BTreeMap<String, Vec<String>>,
}

impl ContextCache {
    fn reindex(&mut self) {
        self.producers.clear();
        self.consumers.clear();
        for (name, manifest) in &self.manifests {
            if !manifest.has_manifest {
                continue;
            }
            for key in &manifest.produces_keys {
                self.producers
                    .entry(key.clone())
                    .or_default()
                    .push(name.clone());
            }
            for key in &manifest.consumes_keys {
                self.consumers
                    .entry(key.clone())
                    .or_default()
                    .push(name.clone());
            }
        }
    }
}

/// Per-invocation view of the context state.
#[derive(Debug)]
pub struct ContextManager {
    cache_path: PathBuf,
    cache: ContextCache,
    data: Option<ContextData>,
    manifest_timeout: Duration,
    dirty: bool,
}

impl ContextManager {
    /// Load the cache from `config_dir`. Read or parse failures yield an
    /// empty state.
    pub fn load(config_dir: &Path) -> Self {
        let cache_path = config_dir.join(CONTEXT_CACHE_FILE);
        let cache = match fs::read_to_string(&cache_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                debug!(path = %cache_path.display(), error = %e, "Ignoring malformed context cache");
                ContextCache::default()
            }),
            Err(e) => {
                debug!(path = %cache_path.display(), error = %e, "No context cache");
                ContextCache::default()
            }
        };
        Self {
            cache_path,
            cache,
            data: None,
            manifest_timeout: MANIFEST_TIMEOUT,
            dirty: false,
        }
    }

    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Manifest of one plugin, from the cache when the cached path matches.
    pub async fn manifest_for(&mut self, descriptor: &PluginDescriptor) -> Option<Manifest> {
        let manifest = match &descriptor.location {
            Location::Inlined => descriptor.manifest.clone()?,
            Location::PluginDir(path) | Location::SearchPath(path) => {
                let path_str = path.display().to_string();
                match self.cache.manifests.get(&descriptor.name) {
                    Some(cached) if cached.path == path_str => cached.clone(),
                    _ => {
                        let fetched = self.query_manifest(path).await;
                        self.cache
                            .manifests
                            .insert(descriptor.name.clone(), fetched.clone());
                        self.cache.reindex();
                        self.dirty = true;
                        fetched
                    }
                }
            }
        };
        manifest.has_manifest.then_some(manifest)
    }

    /// Manifests of every active plugin, keyed by name.
    ///
    /// Refreshes the cache: entries whose path changed are re-queried and
    /// entries for plugins that disappeared are dropped.
    pub async fn manifests(&mut self, catalog: &PluginCatalog) -> BTreeMap<String, Manifest> {
        let mut result = BTreeMap::new();
        let mut present = Vec::new();

        let active: Vec<PluginDescriptor> = catalog.active().cloned().collect();
        for descriptor in &active {
            present.push(descriptor.name.clone());
            if let Some(manifest) = self.manifest_for(descriptor).await {
                result.insert(descriptor.name.clone(), manifest);
            }
        }

        let before = self.cache.manifests.len();
        self.cache.manifests.retain(|name, _| present.contains(name));
        if self.cache.manifests.len() != before {
            self.dirty = true;
        }

        // inlined manifests are self-declared and not stored by manifest_for
        for (name, manifest) in &result {
            if manifest.path.is_empty() && self.cache.manifests.get(name) != Some(manifest) {
                self.cache.manifests.insert(name.clone(), manifest.clone());
                self.dirty = true;
            }
        }
        self.cache.reindex();
        result
    }

    /// Values currently available from in-process producers.
    ///
    /// Each producer is queried at most once per invocation; only keys it
    /// declares are taken, and the first producer of a key in catalog order
    /// wins.
    pub fn fetch(&mut self, catalog: &PluginCatalog) -> ContextData {
        if let Some(data) = &self.data {
            return data.clone();
        }

        let mut data = ContextData::new();
        for descriptor in catalog.active() {
            if descriptor.location != Location::Inlined {
                continue;
            }
            let Some(plugin) = catalog.inlined(&descriptor.name) else {
                continue;
            };
            let Some(producer) = plugin.as_context_aware() else {
                continue;
            };
            let manifest = producer.manifest();
            if manifest.produces_keys.is_empty() {
                continue;
            }
            for (key, value) in producer.context_data() {
                if manifest.produces_keys.contains(&key) {
                    data.entry(key).or_insert(value);
                }
            }
        }

        debug!(keys = data.len(), "Fetched context data");
        self.data = Some(data.clone());
        data
    }

    /// The subset of available context this plugin consumes.
    pub async fn consumed_by(
        &mut self,
        catalog: &PluginCatalog,
        descriptor: &PluginDescriptor,
    ) -> ContextData {
        let Some(manifest) = self.manifest_for(descriptor).await else {
            return ContextData::new();
        };
        if manifest.consumes_keys.is_empty() {
            return ContextData::new();
        }
        self.fetch(catalog)
            .into_iter()
            .filter(|(k, _)| manifest.consumes_keys.contains(k))
            .collect()
    }

    /// Persist the cache if anything changed. Failures are logged and
    /// swallowed.
    pub fn write_cache(&mut self) {
        if !self.dirty {
            return;
        }
        let result = (|| -> crate::error::Result<()> {
            if let Some(parent) = self.cache_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.cache_path, serde_json::to_string_pretty(&self.cache)?)?;
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.dirty = false;
                debug!(path = %self.cache_path.display(), "Wrote context cache");
            }
            Err(e) => {
                debug!(path = %self.cache_path.display(), error = %e, "Cannot write context cache");
            }
        }
    }

    /// Run `<path> manifest` and parse its output. Any failure yields a
    /// manifest with `has_manifest == false`.
    async fn query_manifest(&self, path: &Path) -> Manifest {
        let no_manifest = Manifest {
            path: path.display().to_string(),
            ..Default::default()
        };

        let child = tokio::process::Command::new(path)
            .arg(MANIFEST_ARG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot run plugin for manifest");
                return no_manifest;
            }
        };

        let output = match tokio::time::timeout(self.manifest_timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                debug!(path = %path.display(), status = %output.status, "Manifest query failed");
                return no_manifest;
            }
            Ok(Err(e)) => {
                debug!(path = %path.display(), error = %e, "Manifest query failed");
                return no_manifest;
            }
            Err(_) => {
                debug!(path = %path.display(), "Manifest query timed out");
                return no_manifest;
            }
        };

        match serde_json::from_slice::<Manifest>(&output.stdout) {
            Ok(mut manifest) => {
                manifest.path = path.display().to_string();
                manifest
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Plugin printed an invalid manifest");
                no_manifest
            }
        }
    }
}
