//! Plugin discovery for kn
//!
//! The catalog is rebuilt on every invocation from three sources, in this
//! order: inlined plugins, files in the configured plugin directory, and
//! files on `PATH` when path lookup is enabled. Only files named `kn-*` are
//! considered. The first descriptor seen for a name is active; later ones are
//! kept for reporting and marked as shadowed.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, Env};

use super::classifier::{strip_executable_extension, FileClassifier};
use super::registry::InlinedRegistry;
use super::types::{Location, Plugin, PluginDescriptor, PLUGIN_PREFIX};

/// All plugins visible to this invocation.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    descriptors: Vec<PluginDescriptor>,
    inlined: HashMap<String, Arc<dyn Plugin>>,
    warnings: Vec<String>,
}

impl PluginCatalog {
    /// Enumerate inlined plugins, the plugin directory and (optionally) the
    /// directories on `PATH`.
    ///
    /// A plugin directory that does not exist contributes nothing. A
    /// directory that cannot be read adds a warning but does not fail the
    /// build.
    pub fn build(
        config: &Config,
        registry: &InlinedRegistry,
        classifier: &dyn FileClassifier,
        env: &Env,
    ) -> Self {
        let mut found: Vec<PluginDescriptor> = registry
            .iter()
            .map(|p| PluginDescriptor::inlined(p.as_ref()))
            .collect();
        let mut warnings = Vec::new();

        let plugins_dir = config.plugins_dir();
        found.extend(scan_dir(
            &plugins_dir,
            classifier,
            Location::PluginDir,
            &mut warnings,
        ));

        if config.lookup_plugins_in_path() {
            let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
            seen_dirs.insert(plugins_dir);
            for dir in search_path(env) {
                if !seen_dirs.insert(dir.clone()) {
                    continue;
                }
                found.extend(scan_dir(
                    &dir,
                    classifier,
                    Location::SearchPath,
                    &mut warnings,
                ));
            }
        }

        let mut catalog = Self::from_descriptors(found, registry);
        catalog.warnings = warnings;
        info!(
            plugins = catalog.active().count(),
            shadowed = catalog.descriptors.len() - catalog.active().count(),
            "Plugin catalog built"
        );
        catalog
    }

    /// Build a catalog from descriptors in discovery order.
    ///
    /// Later descriptors with an already seen name are marked as shadowed by
    /// the first one; the result is sorted by name, keeping discovery order
    /// among equal names.
    pub fn from_descriptors(found: Vec<PluginDescriptor>, registry: &InlinedRegistry) -> Self {
        let mut seen: HashMap<String, Location> = HashMap::new();
        let mut descriptors = Vec::with_capacity(found.len());

        for mut descriptor in found {
            match seen.get(&descriptor.name) {
                Some(first) => {
                    debug!(
                        plugin = %descriptor.name,
                        location = %descriptor.location,
                        winner = %first,
                        "Plugin is shadowed"
                    );
                    descriptor.shadowed_by = Some(first.clone());
                }
                None => {
                    seen.insert(descriptor.name.clone(), descriptor.location.clone());
                }
            }
            descriptors.push(descriptor);
        }
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        let inlined = registry
            .iter()
            .map(|p| (p.name().to_string(), Arc::clone(p)))
            .collect();

        Self {
            descriptors,
            inlined,
            warnings: Vec::new(),
        }
    }

    /// Every descriptor, shadowed ones included, sorted by name.
    pub fn list(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }

    /// Descriptors that win for their name.
    pub fn active(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.descriptors.iter().filter(|d| d.is_active())
    }

    /// The active descriptor with this name.
    pub fn find_by_name(&self, name: &str) -> Option<&PluginDescriptor> {
        self.active().find(|d| d.name == name)
    }

    /// The in-process handle for an inlined plugin.
    pub fn inlined(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.inlined.get(name)
    }

    /// Problems found while enumerating directories.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("descriptors", &self.descriptors)
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// Directories listed in `PATH`, in order, skipping empty entries.
fn search_path(env: &Env) -> Vec<PathBuf> {
    env.get("PATH")
        .map(|p| {
            std::env::split_paths(p)
                .filter(|d| !d.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Collect `kn-*` files from one directory.
fn scan_dir(
    dir: &Path,
    classifier: &dyn FileClassifier,
    location: fn(PathBuf) -> Location,
    warnings: &mut Vec<String>,
) -> Vec<PluginDescriptor> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Plugin directory does not exist, skipping");
            return Vec::new();
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read plugin directory");
            warnings.push(format!("cannot read directory {}: {}", dir.display(), e));
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warnings.push(format!("cannot read entry in {}: {}", dir.display(), e));
                None
            }
        })
        .collect();
    // read_dir order is unspecified; keep discovery deterministic
    paths.sort();

    let mut found = Vec::new();
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(PLUGIN_PREFIX) || path.is_dir() {
            continue;
        }
        let name = if classifier.uses_extensions() {
            strip_executable_extension(file_name)
        } else {
            file_name
        };
        debug!(plugin = %name, path = %path.display(), "Discovered plugin file");
        found.push(PluginDescriptor::from_file(name, location(path.clone())));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::config::types::PluginsSection;
    use crate::plugins::classifier::tests::StaticClassifier;
    use crate::plugins::registry::tests::TestPlugin;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\necho ok\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn config_for(plugins_dir: &Path, lookup: bool) -> Config {
        let file = ConfigFile {
            plugins: PluginsSection {
                directory: Some(plugins_dir.display().to_string()),
                path_lookup: Some(lookup),
                ..Default::default()
            },
            ..Default::default()
        };
        Config::from_file(
            plugins_dir.join("config.yaml"),
            file,
            plugins_dir.to_path_buf(),
        )
    }

    fn env_path(dirs: &[&Path]) -> Env {
        let joined = std::env::join_paths(dirs).unwrap();
        let mut env = Env::new();
        env.insert("PATH".to_string(), joined.to_string_lossy().to_string());
        env
    }

    fn names(catalog: &PluginCatalog) -> Vec<&str> {
        catalog.list().iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_only_prefixed_files_are_listed() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "kn-service-log");
        touch(tmp.path(), "kubectl-foo");
        touch(tmp.path(), "README");
        fs::create_dir(tmp.path().join("kn-dir")).unwrap();

        let config = config_for(tmp.path(), false);
        let catalog = PluginCatalog::build(
            &config,
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &Env::new(),
        );
        assert_eq!(names(&catalog), vec!["kn-service-log"]);
        let d = &catalog.list()[0];
        assert_eq!(d.command_parts, vec!["service", "log"]);
        assert!(matches!(d.location, Location::PluginDir(_)));
        assert!(catalog.warnings().is_empty());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(&tmp.path().join("nope"), false);
        let catalog = PluginCatalog::build(
            &config,
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &Env::new(),
        );
        assert!(catalog.is_empty());
        assert!(catalog.warnings().is_empty());
    }

    #[test]
    fn test_path_lookup_is_opt_in() {
        let plugins = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        touch(bin.path(), "kn-admin");
        let env = env_path(&[bin.path()]);

        let off = PluginCatalog::build(
            &config_for(plugins.path(), false),
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &env,
        );
        assert!(off.is_empty());

        let on = PluginCatalog::build(
            &config_for(plugins.path(), true),
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &env,
        );
        assert_eq!(names(&on), vec!["kn-admin"]);
        assert!(matches!(on.list()[0].location, Location::SearchPath(_)));
    }

    #[test]
    fn test_first_seen_wins_and_later_are_shadowed() {
        let plugins = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let winner = touch(plugins.path(), "kn-admin");
        touch(bin.path(), "kn-admin");
        touch(bin.path(), "kn-aaa");
        let env = env_path(&[bin.path()]);

        let catalog = PluginCatalog::build(
            &config_for(plugins.path(), true),
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &env,
        );
        assert_eq!(names(&catalog), vec!["kn-aaa", "kn-admin", "kn-admin"]);
        let admins: Vec<&PluginDescriptor> =
            catalog.list().iter().filter(|d| d.name == "kn-admin").collect();
        assert!(admins[0].is_active());
        assert_eq!(admins[0].location, Location::PluginDir(winner.clone()));
        assert_eq!(admins[1].shadowed_by, Some(Location::PluginDir(winner)));

        let active: Vec<&str> = catalog.active().map(|d| d.name.as_str()).collect();
        assert_eq!(active, vec!["kn-aaa", "kn-admin"]);
        assert!(matches!(
            catalog.find_by_name("kn-admin").unwrap().location,
            Location::PluginDir(_)
        ));
    }

    #[test]
    fn test_inlined_plugins_win_over_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "kn-admin");
        let mut registry = InlinedRegistry::new();
        registry
            .register(Arc::new(TestPlugin::named("kn-admin")))
            .unwrap();

        let catalog = PluginCatalog::build(
            &config_for(tmp.path(), false),
            &registry,
            &StaticClassifier::default(),
            &Env::new(),
        );
        let active = catalog.find_by_name("kn-admin").unwrap();
        assert_eq!(active.location, Location::Inlined);
        assert_eq!(active.description, "test plugin");
        assert!(catalog.inlined("kn-admin").is_some());
        assert_eq!(catalog.list().len(), 2);
    }

    #[test]
    fn test_plugin_dir_on_path_is_scanned_once() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "kn-admin");
        let env = env_path(&[tmp.path()]);
        let catalog = PluginCatalog::build(
            &config_for(tmp.path(), true),
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &env,
        );
        assert_eq!(catalog.list().len(), 1);
    }

    #[test]
    fn test_extensions_are_stripped_when_classifier_uses_them() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "kn-hello.exe");
        let classifier = StaticClassifier {
            extensions: true,
            ..Default::default()
        };
        let catalog = PluginCatalog::build(
            &config_for(tmp.path(), false),
            &InlinedRegistry::new(),
            &classifier,
            &Env::new(),
        );
        let d = &catalog.list()[0];
        assert_eq!(d.name, "kn-hello");
        assert_eq!(d.command_parts, vec!["hello"]);
        assert!(d.path().ends_with("kn-hello.exe"));
    }

    #[test]
    fn test_descriptors_are_sorted_and_unique_when_active() {
        let registry = InlinedRegistry::new();
        let found = vec![
            PluginDescriptor::from_file("kn-b", Location::PluginDir(PathBuf::from("/p/kn-b"))),
            PluginDescriptor::from_file("kn-a", Location::PluginDir(PathBuf::from("/p/kn-a"))),
            PluginDescriptor::from_file("kn-b", Location::SearchPath(PathBuf::from("/u/kn-b"))),
        ];
        let catalog = PluginCatalog::from_descriptors(found, &registry);
        let list = catalog.list();
        assert!(list.windows(2).all(|w| w[0].name <= w[1].name));
        let mut active: Vec<&str> = catalog.active().map(|d| d.name.as_str()).collect();
        let before = active.len();
        active.dedup();
        assert_eq!(before, active.len());
        assert_eq!(
            list[1].location,
            Location::PluginDir(PathBuf::from("/p/kn-b"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_a_warning() {
        use std::os::unix::fs::PermissionsExt;
        if crate::plugins::classifier::UserIdentity::current().is_root() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let catalog = PluginCatalog::build(
            &config_for(&locked, false),
            &InlinedRegistry::new(),
            &StaticClassifier::default(),
            &Env::new(),
        );
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.warnings().len(), 1);
        assert!(catalog.warnings()[0].contains("cannot read directory"));
    }
}
