//! Configuration types for kn
//!
//! The on-disk YAML schema plus the typed keys and values the store exposes.
//! Unknown keys, both at the top level and inside the known sections, are
//! captured in `extra` maps so a load/save cycle never drops them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::KnError;

use super::mappings::{ChannelTypeMapping, SinkMapping};

// ============================================================================
// Keys and values
// ============================================================================

/// The configuration keys the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// `plugins.directory`
    PluginsDirectory,
    /// `plugins.path-lookup`
    PluginsPathLookup,
    /// `eventing.sink-mappings`
    SinkMappings,
    /// `eventing.channel-type-mappings`
    ChannelTypeMappings,
}

impl ConfigKey {
    /// All known keys, in display order.
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::PluginsDirectory,
        ConfigKey::PluginsPathLookup,
        ConfigKey::SinkMappings,
        ConfigKey::ChannelTypeMappings,
    ];

    /// The dotted hierarchical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::PluginsDirectory => "plugins.directory",
            ConfigKey::PluginsPathLookup => "plugins.path-lookup",
            ConfigKey::SinkMappings => "eventing.sink-mappings",
            ConfigKey::ChannelTypeMappings => "eventing.channel-type-mappings",
        }
    }

    /// The legacy flat key read when the hierarchical key is absent.
    pub fn legacy_name(&self) -> Option<&'static str> {
        match self {
            ConfigKey::PluginsDirectory => Some("plugins-dir"),
            ConfigKey::PluginsPathLookup => Some("lookup-plugins"),
            ConfigKey::SinkMappings => Some("sink"),
            ConfigKey::ChannelTypeMappings => None,
        }
    }

    /// Whether the key holds a list.
    pub fn is_list(&self) -> bool {
        matches!(self, ConfigKey::SinkMappings | ConfigKey::ChannelTypeMappings)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = KnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.legacy_name() == Some(s))
            .ok_or_else(|| KnError::UnknownKey(s.to_string()))
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
    List(MappingList),
}

/// The list-valued keys, tagged by mapping kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingList {
    Sink(Vec<SinkMapping>),
    ChannelType(Vec<ChannelTypeMapping>),
}

impl MappingList {
    pub fn len(&self) -> usize {
        match self {
            MappingList::Sink(l) => l.len(),
            MappingList::ChannelType(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// File schema
// ============================================================================

/// The YAML config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "PluginsSection::is_empty")]
    pub plugins: PluginsSection,

    #[serde(default, skip_serializing_if = "EventingSection::is_empty")]
    pub eventing: EventingSection,

    /// Legacy flat `plugins-dir`.
    #[serde(
        rename = "plugins-dir",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_plugins_dir: Option<String>,

    /// Legacy flat `lookup-plugins`.
    #[serde(
        rename = "lookup-plugins",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_lookup_plugins: Option<bool>,

    /// Legacy flat `sink` list.
    #[serde(rename = "sink", default, skip_serializing_if = "Option::is_none")]
    pub legacy_sink: Option<Vec<SinkMapping>>,

    /// Everything else, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The `plugins:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    #[serde(
        rename = "path-lookup",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub path_lookup: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PluginsSection {
    fn is_empty(&self) -> bool {
        self.directory.is_none() && self.path_lookup.is_none() && self.extra.is_empty()
    }
}

/// The `eventing:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventingSection {
    #[serde(
        rename = "sink-mappings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sink_mappings: Option<Vec<SinkMapping>>,

    #[serde(
        rename = "channel-type-mappings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_type_mappings: Option<Vec<ChannelTypeMapping>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EventingSection {
    fn is_empty(&self) -> bool {
        self.sink_mappings.is_none() && self.channel_type_mappings.is_none() && self.extra.is_empty()
    }
}
