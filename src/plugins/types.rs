//! Plugin types for kn
//!
//! This module defines the data model of the plugin subsystem: descriptors
//! produced by the catalog, manifests used for context sharing, and the
//! capability traits implemented by in-process plugins.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Prefix every plugin name must carry.
pub const PLUGIN_PREFIX: &str = "kn-";

/// Context data exchanged between plugins: key → value.
pub type ContextData = BTreeMap<String, String>;

/// Where a plugin was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Registered in-process.
    Inlined,
    /// A file in the configured plugin directory.
    PluginDir(PathBuf),
    /// A file in a directory on `PATH`.
    SearchPath(PathBuf),
}

impl Location {
    /// Filesystem path, `None` for inlined plugins.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Location::Inlined => None,
            Location::PluginDir(p) | Location::SearchPath(p) => Some(p),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Inlined => f.write_str("(inlined)"),
            Location::PluginDir(p) | Location::SearchPath(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Self-description of a plugin's context keys.
///
/// External plugins print this as JSON when invoked with the single argument
/// `manifest`:
///
/// ```json
/// { "hasManifest": true, "producesKeys": ["service"], "consumesKeys": [] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub has_manifest: bool,

    #[serde(default)]
    pub produces_keys: BTreeSet<String>,

    #[serde(default)]
    pub consumes_keys: BTreeSet<String>,

    /// Path of the external binary; empty for inlined plugins.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// One plugin as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Canonical name including the prefix, e.g. `kn-source-kafka`.
    pub name: String,
    /// Verb tokens derived from the name, e.g. `["source", "kafka"]`.
    pub command_parts: Vec<String>,
    pub location: Location,
    pub manifest: Option<Manifest>,
    /// Location of the earlier descriptor with the same name, if any.
    pub shadowed_by: Option<Location>,
    pub description: String,
}

impl PluginDescriptor {
    /// Descriptor for a file, deriving the command parts from its name.
    pub fn from_file(name: &str, location: Location) -> Self {
        Self {
            name: name.to_string(),
            command_parts: command_parts_from_name(name),
            location,
            manifest: None,
            shadowed_by: None,
            description: String::new(),
        }
    }

    /// Descriptor for an in-process plugin.
    pub fn inlined(plugin: &dyn Plugin) -> Self {
        Self {
            name: plugin.name().to_string(),
            command_parts: plugin.command_parts(),
            location: Location::Inlined,
            manifest: plugin.as_context_aware().map(|p| p.manifest()),
            shadowed_by: None,
            description: plugin.description().to_string(),
        }
    }

    /// Whether this descriptor is the one that wins for its name.
    pub fn is_active(&self) -> bool {
        self.shadowed_by.is_none()
    }

    /// Path of the binary; empty for inlined plugins.
    pub fn path(&self) -> String {
        self.location
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// Derive verb tokens from a plugin name: strip the prefix, split on `-`,
/// normalize `_` to `-`.
pub fn command_parts_from_name(name: &str) -> Vec<String> {
    let Some(rest) = name.strip_prefix(PLUGIN_PREFIX) else {
        return Vec::new();
    };
    rest.split('-')
        .filter(|p| !p.is_empty())
        .map(|p| p.replace('_', "-"))
        .collect()
}

/// Canonical plugin name for a sequence of positional tokens: `-` inside a
/// token becomes `_`, tokens are joined with `-`.
pub fn name_from_tokens(tokens: &[String]) -> String {
    let joined: Vec<String> = tokens.iter().map(|t| t.replace('-', "_")).collect();
    format!("{}{}", PLUGIN_PREFIX, joined.join("-"))
}

// ---------------------------------------------------------------------------
// In-process capabilities
// ---------------------------------------------------------------------------

/// Base capability of an in-process plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Canonical name including the prefix.
    fn name(&self) -> &str;

    /// Verb tokens the plugin answers to.
    fn command_parts(&self) -> Vec<String> {
        command_parts_from_name(self.name())
    }

    /// One-line description shown by `plugin list`.
    fn description(&self) -> &str {
        ""
    }

    /// Run with the user's remaining arguments.
    async fn execute(&self, cancel: CancellationToken, args: &[String]) -> anyhow::Result<()>;

    /// The context extension, when implemented.
    fn as_context_aware(&self) -> Option<&dyn ContextAwarePlugin> {
        None
    }
}

/// Extension capability for plugins taking part in context sharing.
#[async_trait]
pub trait ContextAwarePlugin: Send + Sync {
    /// Which keys this plugin produces and consumes.
    fn manifest(&self) -> Manifest;

    /// Current values of the keys this plugin produces.
    fn context_data(&self) -> ContextData;

    /// Run with the context values for the keys this plugin consumes.
    async fn execute_with_context(
        &self,
        cancel: CancellationToken,
        context: &ContextData,
        args: &[String],
    ) -> anyhow::Result<()>;
}
