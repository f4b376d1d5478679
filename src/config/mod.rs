//! Configuration store for kn
//!
//! A [`Config`] is loaded once per invocation from a YAML file and threaded
//! through the root command; there is no process-wide instance. Values are
//! resolved in this order:
//!
//! 1. flag bindings (`--plugins-dir`, `--lookup-plugins`), process-local
//! 2. the hierarchical key in the file (`plugins.directory`)
//! 3. the legacy flat key in the file (`plugins-dir`)
//! 4. built-in defaults
//!
//! The file is written back only through [`Config::save`], which the root
//! command calls once, and only after the command succeeded.
//!
//! # Example config.yaml
//!
//! ```yaml
//! plugins:
//!   directory: ~/.config/kn/plugins
//!   path-lookup: true
//! eventing:
//!   sink-mappings:
//!     - prefix: svc
//!       resource: services
//!       group: core
//!       version: v1
//!   channel-type-mappings:
//!     - alias: Kafka
//!       kind: KafkaChannel
//!       group: messaging.knative.dev
//!       version: v1alpha1
//! ```

pub mod mappings;
pub mod types;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::flags::BootstrapFlags;
use crate::error::{KnError, Result};

pub use mappings::{ChannelTypeMapping, SinkMapping};
pub use types::{ConfigFile, ConfigKey, ConfigValue, MappingList};

/// Environment snapshot used for path resolution.
pub type Env = HashMap<String, String>;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "KN_CONFIG";

const APP_DIR: &str = "kn";
const CONFIG_FILE_NAME: &str = "config.yaml";
const PLUGINS_DIR_NAME: &str = "plugins";

/// The loaded configuration plus its process-local flag overrides.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    file: ConfigFile,
    overrides: HashMap<ConfigKey, ConfigValue>,
    default_plugins_dir: PathBuf,
}

impl Config {
    /// Load configuration for this invocation.
    ///
    /// The file path comes from `--config`, then `KN_CONFIG`, then the XDG
    /// default. A missing file is not an error. Bootstrap flags that map to
    /// config keys are bound as overrides.
    pub fn load(flags: &BootstrapFlags, env: &Env) -> Result<Self> {
        let base = default_config_dir(env);
        let path = flags
            .config
            .clone()
            .or_else(|| {
                env.get(CONFIG_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| base.join(CONFIG_FILE_NAME));

        let file = read_config_file(&path)?;
        debug!(path = %path.display(), "Loaded configuration");

        let mut config = Self {
            path,
            file,
            overrides: HashMap::new(),
            default_plugins_dir: base.join(PLUGINS_DIR_NAME),
        };

        if let Some(dir) = &flags.plugins_dir {
            config.bind_flag(ConfigKey::PluginsDirectory, ConfigValue::String(dir.clone()))?;
        }
        if let Some(lookup) = flags.lookup_plugins {
            config.bind_flag(ConfigKey::PluginsPathLookup, ConfigValue::Bool(lookup))?;
        }

        Ok(config)
    }

    /// Build a config from an in-memory file, for tests and embedding.
    pub fn from_file(path: PathBuf, file: ConfigFile, default_plugins_dir: PathBuf) -> Self {
        Self {
            path,
            file,
            overrides: HashMap::new(),
            default_plugins_dir,
        }
    }

    /// Path of the config file (whether or not it exists yet).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the config file; the context cache lives here too.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The raw file contents as loaded (and mutated).
    pub fn file(&self) -> &ConfigFile {
        &self.file
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve a key. Returns `None` when neither an override, the file nor
    /// a default provides a value.
    pub fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        if let Some(v) = self.overrides.get(&key) {
            return Some(v.clone());
        }
        let f = &self.file;
        match key {
            ConfigKey::PluginsDirectory => f
                .plugins
                .directory
                .clone()
                .or_else(|| f.legacy_plugins_dir.clone())
                .map(ConfigValue::String),
            ConfigKey::PluginsPathLookup => f
                .plugins
                .path_lookup
                .or(f.legacy_lookup_plugins)
                .map(ConfigValue::Bool),
            ConfigKey::SinkMappings => f
                .eventing
                .sink_mappings
                .clone()
                .or_else(|| f.legacy_sink.clone())
                .map(|l| ConfigValue::List(MappingList::Sink(l))),
            ConfigKey::ChannelTypeMappings => f
                .eventing
                .channel_type_mappings
                .clone()
                .map(|l| ConfigValue::List(MappingList::ChannelType(l))),
        }
    }

    /// Resolve a key given by name (`plugins.directory`, `plugins-dir`, ...).
    pub fn get_by_name(&self, name: &str) -> Result<Option<ConfigValue>> {
        Ok(self.get(name.parse()?))
    }

    /// The value in effect for `key`: [`get`](Self::get) with defaults
    /// applied. The plugin directory is resolved, path lookup defaults to
    /// off and missing lists are empty.
    pub fn effective(&self, key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::PluginsDirectory => {
                ConfigValue::String(self.plugins_dir().display().to_string())
            }
            ConfigKey::PluginsPathLookup => ConfigValue::Bool(self.lookup_plugins_in_path()),
            ConfigKey::SinkMappings => ConfigValue::List(MappingList::Sink(self.sink_mappings())),
            ConfigKey::ChannelTypeMappings => {
                ConfigValue::List(MappingList::ChannelType(self.channel_type_mappings()))
            }
        }
    }

    /// The plugin directory, with `~` expanded and the default applied.
    pub fn plugins_dir(&self) -> PathBuf {
        match self.get(ConfigKey::PluginsDirectory) {
            Some(ConfigValue::String(dir)) if !dir.is_empty() => expand_home(&dir),
            _ => self.default_plugins_dir.clone(),
        }
    }

    /// Whether plugins are also looked up on `PATH`.
    pub fn lookup_plugins_in_path(&self) -> bool {
        matches!(
            self.get(ConfigKey::PluginsPathLookup),
            Some(ConfigValue::Bool(true))
        )
    }

    /// The configured sink mappings, in insertion order.
    pub fn sink_mappings(&self) -> Vec<SinkMapping> {
        match self.get(ConfigKey::SinkMappings) {
            Some(ConfigValue::List(MappingList::Sink(l))) => l,
            _ => Vec::new(),
        }
    }

    /// The configured channel type mappings, in insertion order.
    pub fn channel_type_mappings(&self) -> Vec<ChannelTypeMapping> {
        match self.get(ConfigKey::ChannelTypeMappings) {
            Some(ConfigValue::List(MappingList::ChannelType(l))) => l,
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Set a scalar key in the file.
    ///
    /// List keys are rejected with `NonScalarKey`; the value must match the
    /// key's type. An override bound for the same key keeps winning for the
    /// rest of this process.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<()> {
        if key.is_list() {
            return Err(KnError::NonScalarKey(key.to_string()));
        }
        match (key, value) {
            (ConfigKey::PluginsDirectory, ConfigValue::String(s)) => {
                self.file.plugins.directory = Some(s);
            }
            (ConfigKey::PluginsPathLookup, ConfigValue::Bool(b)) => {
                self.file.plugins.path_lookup = Some(b);
            }
            (key, value) => {
                return Err(KnError::InvalidValue {
                    key: key.to_string(),
                    value: format!("{:?}", value),
                })
            }
        }
        Ok(())
    }

    /// Set a scalar key from its textual form, as typed on the command line.
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<()> {
        let key: ConfigKey = name.parse()?;
        let value = match key {
            ConfigKey::PluginsPathLookup => match raw {
                "true" => ConfigValue::Bool(true),
                "false" => ConfigValue::Bool(false),
                _ => {
                    return Err(KnError::InvalidValue {
                        key: key.to_string(),
                        value: raw.to_string(),
                    })
                }
            },
            _ => ConfigValue::String(raw.to_string()),
        };
        self.set(key, value)
    }

    /// Apply a pure transform to a list-valued key and store the result
    /// under the hierarchical key.
    ///
    /// The transform receives the currently resolved list (legacy fallback
    /// included) and must return a list of the same kind.
    pub fn mutate_list<F>(&mut self, key: ConfigKey, transform: F) -> Result<()>
    where
        F: FnOnce(MappingList) -> Result<MappingList>,
    {
        let current = match key {
            ConfigKey::SinkMappings => MappingList::Sink(self.sink_mappings()),
            ConfigKey::ChannelTypeMappings => {
                MappingList::ChannelType(self.channel_type_mappings())
            }
            other => {
                return Err(KnError::InvalidValue {
                    key: other.to_string(),
                    value: "<list>".to_string(),
                })
            }
        };

        match (key, transform(current)?) {
            (ConfigKey::SinkMappings, MappingList::Sink(l)) => {
                self.file.eventing.sink_mappings = Some(l);
            }
            (ConfigKey::ChannelTypeMappings, MappingList::ChannelType(l)) => {
                self.file.eventing.channel_type_mappings = Some(l);
            }
            (key, _) => {
                return Err(KnError::Internal(format!(
                    "list transform for '{}' returned a different mapping kind",
                    key
                )))
            }
        }
        Ok(())
    }

    /// Typed shorthand for [`mutate_list`](Self::mutate_list) on sink mappings.
    pub fn mutate_sink_mappings<F>(&mut self, transform: F) -> Result<()>
    where
        F: FnOnce(Vec<SinkMapping>) -> Result<Vec<SinkMapping>>,
    {
        self.mutate_list(ConfigKey::SinkMappings, |list| match list {
            MappingList::Sink(l) => Ok(MappingList::Sink(transform(l)?)),
            other => Ok(other),
        })
    }

    /// Typed shorthand for [`mutate_list`](Self::mutate_list) on channel types.
    pub fn mutate_channel_type_mappings<F>(&mut self, transform: F) -> Result<()>
    where
        F: FnOnce(Vec<ChannelTypeMapping>) -> Result<Vec<ChannelTypeMapping>>,
    {
        self.mutate_list(ConfigKey::ChannelTypeMappings, |list| match list {
            MappingList::ChannelType(l) => Ok(MappingList::ChannelType(transform(l)?)),
            other => Ok(other),
        })
    }

    /// Override a key for the current process only. Never persisted.
    pub fn bind_flag(&mut self, key: ConfigKey, value: ConfigValue) -> Result<()> {
        let fits = matches!(
            (key, &value),
            (ConfigKey::PluginsDirectory, ConfigValue::String(_))
                | (ConfigKey::PluginsPathLookup, ConfigValue::Bool(_))
                | (ConfigKey::SinkMappings, ConfigValue::List(MappingList::Sink(_)))
                | (
                    ConfigKey::ChannelTypeMappings,
                    ConfigValue::List(MappingList::ChannelType(_))
                )
        );
        if !fits {
            return Err(KnError::InvalidValue {
                key: key.to_string(),
                value: format!("{:?}", value),
            });
        }
        self.overrides.insert(key, value);
        Ok(())
    }

    /// Write the file back, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    KnError::config(&self.path, format!("cannot create directory: {}", e))
                })?;
            }
        }
        let content = serde_yaml_bw::to_string(&self.file)?;
        fs::write(&self.path, content)
            .map_err(|e| KnError::config(&self.path, format!("cannot write file: {}", e)))?;
        debug!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }
}

/// Read and parse the config file. Missing or empty files yield defaults.
fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
        Err(e) => return Err(KnError::config(path, format!("cannot read file: {}", e))),
    };
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml_bw::from_str(&content).map_err(|e| KnError::config(path, e.to_string()))
}

/// `$XDG_CONFIG_HOME/kn`, falling back to `~/.config/kn`.
pub fn default_config_dir(env: &Env) -> PathBuf {
    if let Some(xdg) = env.get("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR);
    }
    if cfg!(windows) {
        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_DIR);
        }
    }
    let home = env
        .get("HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join(APP_DIR)
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_with(pairs: &[(&str, &str)]) -> Env {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn kafka() -> ChannelTypeMapping {
        ChannelTypeMapping {
            alias: "Kafka".to_string(),
            kind: "KafkaChannel".to_string(),
            group: "messaging.knative.dev".to_string(),
            version: "v1alpha1".to_string(),
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_path_uses_xdg() {
        let tmp = TempDir::new().unwrap();
        let env = env_with(&[("XDG_CONFIG_HOME", tmp.path().to_str().unwrap())]);
        let config = Config::load(&BootstrapFlags::default(), &env).unwrap();
        assert_eq!(config.path(), tmp.path().join("kn").join("config.yaml"));
        assert_eq!(config.plugins_dir(), tmp.path().join("kn").join("plugins"));
        assert!(!config.lookup_plugins_in_path());
    }

    #[test]
    fn test_flag_beats_env_beats_default() {
        let tmp = TempDir::new().unwrap();
        let from_env = write(&tmp, "env.yaml", "plugins:\n  directory: /from/env\n");
        let from_flag = write(&tmp, "flag.yaml", "plugins:\n  directory: /from/flag\n");
        let env = env_with(&[
            ("XDG_CONFIG_HOME", tmp.path().to_str().unwrap()),
            (CONFIG_ENV, from_env.to_str().unwrap()),
        ]);

        let config = Config::load(&BootstrapFlags::default(), &env).unwrap();
        assert_eq!(config.path(), from_env);
        assert_eq!(config.plugins_dir(), PathBuf::from("/from/env"));

        let flags = BootstrapFlags {
            config: Some(from_flag.clone()),
            ..Default::default()
        };
        let config = Config::load(&flags, &env).unwrap();
        assert_eq!(config.path(), from_flag);
        assert_eq!(config.plugins_dir(), PathBuf::from("/from/flag"));
    }

    #[test]
    fn test_malformed_file_names_path() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "bad.yaml", "plugins: [unclosed\n");
        let flags = BootstrapFlags {
            config: Some(path.clone()),
            ..Default::default()
        };
        let err = Config::load(&flags, &Env::new()).unwrap_err();
        assert!(matches!(err, KnError::Config { .. }));
        assert!(err.to_string().contains(path.to_str().unwrap()));
    }

    #[test]
    fn test_empty_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "empty.yaml", "\n");
        let flags = BootstrapFlags {
            config: Some(path),
            ..Default::default()
        };
        let config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.file(), &ConfigFile::default());
    }

    #[test]
    fn test_legacy_keys_are_fallbacks() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.yaml",
            "plugins-dir: /legacy\nlookup-plugins: true\n",
        );
        let flags = BootstrapFlags {
            config: Some(path.clone()),
            ..Default::default()
        };
        let config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.plugins_dir(), PathBuf::from("/legacy"));
        assert!(config.lookup_plugins_in_path());

        let path = write(
            &tmp,
            "both.yaml",
            "plugins-dir: /legacy\nplugins:\n  directory: /modern\n",
        );
        let flags = BootstrapFlags {
            config: Some(path),
            ..Default::default()
        };
        let config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.plugins_dir(), PathBuf::from("/modern"));
    }

    #[test]
    fn test_flag_binding_overrides_file_but_is_not_saved() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.yaml", "plugins:\n  directory: /stored\n");
        let flags = BootstrapFlags {
            config: Some(path.clone()),
            plugins_dir: Some("/from/flag".to_string()),
            lookup_plugins: Some(true),
            ..Default::default()
        };
        let config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.plugins_dir(), PathBuf::from("/from/flag"));
        assert!(config.lookup_plugins_in_path());

        config.save().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("/stored"));
        assert!(!content.contains("/from/flag"));
        assert!(!content.contains("path-lookup"));
    }

    #[test]
    fn test_set_rejects_list_keys() {
        let mut config = Config::from_file(
            PathBuf::from("/tmp/none.yaml"),
            ConfigFile::default(),
            PathBuf::from("/tmp/plugins"),
        );
        let err = config
            .set(ConfigKey::SinkMappings, ConfigValue::String("x".into()))
            .unwrap_err();
        assert!(matches!(err, KnError::NonScalarKey(_)));

        let err = config
            .set(ConfigKey::PluginsPathLookup, ConfigValue::String("x".into()))
            .unwrap_err();
        assert!(matches!(err, KnError::InvalidValue { .. }));

        config.set_from_str("plugins.path-lookup", "true").unwrap();
        assert!(config.lookup_plugins_in_path());
        assert!(config.set_from_str("plugins.path-lookup", "yes").is_err());
        assert!(config.set_from_str("plugins.colour", "blue").is_err());
    }

    #[test]
    fn test_mutate_list_and_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.yaml");
        let mut config = Config::from_file(
            path.clone(),
            ConfigFile::default(),
            tmp.path().join("plugins"),
        );

        config
            .mutate_channel_type_mappings(|l| mappings::add(l, kafka()))
            .unwrap();
        assert_eq!(config.channel_type_mappings(), vec![kafka()]);
        config.save().unwrap();

        let flags = BootstrapFlags {
            config: Some(path),
            ..Default::default()
        };
        let reloaded = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(reloaded.channel_type_mappings(), vec![kafka()]);
    }

    #[test]
    fn test_mutate_list_rejects_kind_change() {
        let mut config = Config::from_file(
            PathBuf::from("/tmp/none.yaml"),
            ConfigFile::default(),
            PathBuf::from("/tmp/plugins"),
        );
        let err = config
            .mutate_list(ConfigKey::SinkMappings, |_| {
                Ok(MappingList::ChannelType(vec![]))
            })
            .unwrap_err();
        assert!(matches!(err, KnError::Internal(_)));
    }

    #[test]
    fn test_mutate_failure_leaves_list_untouched() {
        let mut config = Config::from_file(
            PathBuf::from("/tmp/none.yaml"),
            ConfigFile::default(),
            PathBuf::from("/tmp/plugins"),
        );
        config
            .mutate_channel_type_mappings(|l| mappings::add(l, kafka()))
            .unwrap();
        let err = config
            .mutate_channel_type_mappings(|l| mappings::add(l, kafka()))
            .unwrap_err();
        assert!(matches!(err, KnError::AliasExists(_)));
        assert_eq!(config.channel_type_mappings().len(), 1);
    }

    #[test]
    fn test_legacy_sink_migrates_on_mutation() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.yaml",
            "sink:\n  - prefix: svc\n    resource: services\n    group: core\n    version: v1\n",
        );
        let flags = BootstrapFlags {
            config: Some(path),
            ..Default::default()
        };
        let mut config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.sink_mappings().len(), 1);

        config
            .mutate_sink_mappings(|l| Ok(mappings::delete(l, "nothing")))
            .unwrap();
        assert_eq!(config.file().eventing.sink_mappings.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_get_by_name() {
        let mut config = Config::from_file(
            PathBuf::from("/tmp/none.yaml"),
            ConfigFile::default(),
            PathBuf::from("/tmp/plugins"),
        );
        assert_eq!(config.get_by_name("plugins.directory").unwrap(), None);
        config.set_from_str("plugins-dir", "/x").unwrap();
        assert_eq!(
            config.get_by_name("plugins.directory").unwrap(),
            Some(ConfigValue::String("/x".to_string()))
        );
        assert!(config.get_by_name("nope").is_err());
    }

    #[test]
    fn test_effective_applies_defaults() {
        let config = Config::from_file(
            PathBuf::from("/tmp/none.yaml"),
            ConfigFile::default(),
            PathBuf::from("/tmp/plugins"),
        );
        assert_eq!(
            config.effective(ConfigKey::PluginsDirectory),
            ConfigValue::String("/tmp/plugins".to_string())
        );
        assert_eq!(
            config.effective(ConfigKey::PluginsPathLookup),
            ConfigValue::Bool(false)
        );
        assert_eq!(
            config.effective(ConfigKey::SinkMappings),
            ConfigValue::List(MappingList::Sink(vec![]))
        );
    }

    #[test]
    fn test_update_and_delete_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.yaml", "foo: bar\n");
        let flags = BootstrapFlags {
            config: Some(path.clone()),
            ..Default::default()
        };
        let rabbit = ChannelTypeMapping {
            alias: "RabbitMQ".to_string(),
            kind: "RabbitChannel".to_string(),
            group: "messaging.knative.dev".to_string(),
            version: "v1alpha1".to_string(),
        };

        let mut config = Config::load(&flags, &Env::new()).unwrap();
        config
            .mutate_channel_type_mappings(|l| mappings::add(l, kafka()))
            .unwrap();
        config
            .mutate_channel_type_mappings(|l| mappings::add(l, rabbit.clone()))
            .unwrap();
        let updated = ChannelTypeMapping {
            version: "v1beta1".to_string(),
            ..rabbit
        };
        config
            .mutate_channel_type_mappings(|l| mappings::update(l, updated.clone()))
            .unwrap();
        config.save().unwrap();

        let mut config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.channel_type_mappings(), vec![kafka(), updated]);

        config
            .mutate_channel_type_mappings(|l| Ok(mappings::delete(l, "RabbitMQ")))
            .unwrap();
        config.save().unwrap();

        let config = Config::load(&flags, &Env::new()).unwrap();
        assert_eq!(config.channel_type_mappings(), vec![kafka()]);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("foo: bar"));
    }
}
