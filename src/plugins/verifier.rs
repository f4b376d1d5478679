//! Plugin verification
//!
//! Checks every catalog entry for problems that make a plugin unusable or
//! surprising. Errors mean the plugin can never be invoked (it would replace a
//! built-in command, or its name does not describe a command); warnings are
//! informational.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::commands::tree::{command_path, CommandTree};

use super::catalog::PluginCatalog;
use super::classifier::{Executability, FileClassifier};
use super::types::{Location, PluginDescriptor, PLUGIN_PREFIX};

/// `kn-` followed by one or more non-empty parts separated by single dashes.
static PLUGIN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^kn(-[^-\s/\\]+)+$").expect("static regex"));

/// Check results for one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub name: String,
    pub location: Option<Location>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Verifies descriptors against the command tree and the file system.
pub struct PluginVerifier<'a> {
    tree: &'a CommandTree,
    classifier: &'a dyn FileClassifier,
}

impl<'a> PluginVerifier<'a> {
    pub fn new(tree: &'a CommandTree, classifier: &'a dyn FileClassifier) -> Self {
        Self { tree, classifier }
    }

    /// Verify every descriptor in the catalog, in catalog order.
    pub fn verify_all(&self, catalog: &PluginCatalog) -> Vec<Verification> {
        catalog.list().iter().map(|d| self.verify(d)).collect()
    }

    /// Run all checks on one descriptor.
    pub fn verify(&self, descriptor: &PluginDescriptor) -> Verification {
        let mut result = Verification {
            name: descriptor.name.clone(),
            location: Some(descriptor.location.clone()),
            ..Default::default()
        };

        if !descriptor.name.starts_with(PLUGIN_PREFIX) {
            result.warnings.push(format!(
                "plugin name '{}' does not start with '{}'",
                descriptor.name, PLUGIN_PREFIX
            ));
        }

        if let Some(path) = descriptor.location.path() {
            if let Executability::NotExecutable(reason) = self.classifier.classify(path) {
                result
                    .warnings
                    .push(format!("{} is not executable: {}", path.display(), reason));
            }
        }

        if let Some(first) = &descriptor.shadowed_by {
            result
                .warnings
                .push(format!("shadowed by {} with the same name", first));
        }

        if descriptor.command_parts.is_empty() || !PLUGIN_NAME_RE.is_match(&descriptor.name) {
            result.errors.push(format!(
                "plugin name '{}' does not name a command; expected '{}<command>[-<sub-command>...]'",
                descriptor.name, PLUGIN_PREFIX
            ));
        } else if let Some(overwritten) = self.overwritten_command(descriptor) {
            result
                .errors
                .push(format!("overwrites the built-in command '{}'", overwritten));
        }

        result
    }

    /// The built-in command this plugin would replace, if any.
    ///
    /// Both the normalized parts (`foo_bar` → `foo-bar`) and the raw dash
    /// split of the name are checked.
    fn overwritten_command(&self, descriptor: &PluginDescriptor) -> Option<String> {
        let raw: Vec<String> = descriptor
            .name
            .strip_prefix(PLUGIN_PREFIX)
            .unwrap_or(&descriptor.name)
            .split('-')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        for parts in [&descriptor.command_parts, &raw] {
            if self.tree.node_at(parts).is_some() {
                return Some(command_path(parts));
            }
        }
        None
    }
}
