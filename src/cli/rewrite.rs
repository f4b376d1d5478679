//! Argument rewriting.
//!
//! The raw command line is looked at twice: once as positional tokens (flags
//! removed) to decide between a built-in command and a plugin, and once as
//! the full vector from which the command path is cut out before the rest is
//! handed to a leaf parser or a plugin.
//!
//! Built-in commands always win. The plugin catalog is consulted only when
//! no built-in leaf matches, and a plugin may only extend a group, never
//! stand in for it.

use std::collections::HashSet;

use crate::commands::tree::{CommandNode, CommandTree};
use crate::error::{KnError, Result};
use crate::plugins::{PluginCatalog, PluginDispatcher, PluginMatch};

use super::flags::{remove_bootstrap_flags, FlagRegistry};

/// What the command line asks for.
#[derive(Debug)]
pub enum Invocation<'t> {
    /// A built-in leaf with its arguments (bootstrap flags and the command
    /// path removed).
    Leaf {
        node: &'t CommandNode,
        path: Vec<String>,
        args: Vec<String>,
    },
    /// A plugin.
    Plugin(PluginMatch),
    /// A group (or the root) without a runnable child.
    Group {
        node: &'t CommandNode,
        path: Vec<String>,
        remaining: Vec<String>,
    },
}

/// Classifies and rewrites command lines.
#[derive(Debug, Clone, Default)]
pub struct ArgumentRewriter {
    registry: FlagRegistry,
}

impl ArgumentRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: FlagRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    /// Positional tokens of `argv`.
    pub fn strip_bootstrap_flags(&self, argv: &[String]) -> Vec<String> {
        strip_flags(argv, &self.registry)
    }

    /// Decide what `argv` invokes.
    pub fn classify<'t>(
        &self,
        tree: &'t CommandTree,
        catalog: &PluginCatalog,
        argv: &[String],
    ) -> Invocation<'t> {
        let positional = self.strip_bootstrap_flags(argv);
        let found = tree.find(&positional);
        let path = found.path.to_vec();

        if found.node.is_leaf() {
            let args = split_for_plugin(&remove_bootstrap_flags(argv, &self.registry), &path);
            return Invocation::Leaf {
                node: found.node,
                path,
                args,
            };
        }

        if !found.remaining.is_empty() {
            // plugins extend the matched group by at least one verb
            let min_parts = path.len() + 1;
            if let Some(m) = PluginDispatcher::match_plugin(catalog, argv, &self.registry, min_parts)
            {
                return Invocation::Plugin(m);
            }
        }

        Invocation::Group {
            node: found.node,
            path,
            remaining: found.remaining.to_vec(),
        }
    }

    /// The deepest node matched by `argv` must be a leaf, or nothing may
    /// follow it.
    pub fn validate_against_tree(&self, tree: &CommandTree, argv: &[String]) -> Result<()> {
        let positional = self.strip_bootstrap_flags(argv);
        let found = tree.find(&positional);
        if found.node.is_leaf() || found.remaining.is_empty() {
            return Ok(());
        }
        Err(tree.group_error(&found))
    }
}

/// Remove every token starting with `-`, plus the separate value of known
/// value-taking flags. Unknown flags are assumed to take no value.
pub fn strip_flags(argv: &[String], registry: &FlagRegistry) -> Vec<String> {
    let mut positional = Vec::with_capacity(argv.len());
    let mut iter = argv.iter();
    while let Some(token) = iter.next() {
        if token.starts_with('-') {
            if registry.takes_separate_value(token) {
                iter.next();
            }
            continue;
        }
        positional.push(token.clone());
    }
    positional
}

/// Remove the first maximal contiguous run of `parts` from `argv`.
///
/// The run starts at the first occurrence of `parts[0]` and extends as long
/// as the following tokens continue `parts` in order.
pub fn split_for_plugin(argv: &[String], parts: &[String]) -> Vec<String> {
    let Some(first) = parts.first() else {
        return argv.to_vec();
    };
    let Some(start) = argv.iter().position(|t| t == first) else {
        return argv.to_vec();
    };
    let len = argv[start..]
        .iter()
        .zip(parts)
        .take_while(|(a, p)| a == p)
        .count();

    let mut out = Vec::with_capacity(argv.len() - len);
    out.extend_from_slice(&argv[..start]);
    out.extend_from_slice(&argv[start + len..]);
    out
}

/// Reject `--X` given together with `--no-X`.
pub fn check_boolean_pairs(argv: &[String]) -> Result<()> {
    let names: HashSet<&str> = argv
        .iter()
        .filter_map(|t| t.strip_prefix("--"))
        .filter(|n| !n.is_empty())
        .map(|n| n.split_once('=').map_or(n, |(name, _)| name))
        .collect();

    for token in argv {
        let Some(name) = token.strip_prefix("--no-") else {
            continue;
        };
        let name = name.split_once('=').map_or(name, |(n, _)| n);
        if names.contains(name) {
            return Err(KnError::FlagConflict {
                flag: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tree::tests::sample_tree;
    use crate::plugins::types::{Location, PluginDescriptor};
    use crate::plugins::InlinedRegistry;
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn catalog(names: &[&str]) -> PluginCatalog {
        let found = names
            .iter()
            .map(|n| {
                PluginDescriptor::from_file(
                    n,
                    Location::PluginDir(PathBuf::from(format!("/plugins/{}", n))),
                )
            })
            .collect();
        PluginCatalog::from_descriptors(found, &InlinedRegistry::new())
    }

    #[test]
    fn test_strip_removes_flags_and_bootstrap_values() {
        let rw = ArgumentRewriter::new();
        let out = rw.strip_bootstrap_flags(&args(&[
            "--config",
            "/c.yaml",
            "service",
            "--namespace",
            "ns",
            "-",
            "--",
            "create",
            "--plugins-dir=/p",
            "hello",
        ]));
        // --namespace is unknown here, so "ns" stays positional
        assert_eq!(out, args(&["service", "ns", "create", "hello"]));
        assert!(out.iter().all(|t| !t.starts_with('-')));
    }

    #[test]
    fn test_split_for_plugin_contiguous() {
        let argv = args(&["--o", "val", "one", "second", "rest"]);
        assert_eq!(
            split_for_plugin(&argv, &args(&["one", "second"])),
            args(&["--o", "val", "rest"])
        );
    }

    #[test]
    fn test_split_for_plugin_partial_run() {
        let argv = args(&["--o", "val", "one", "second", "rest"]);
        assert_eq!(
            split_for_plugin(&argv, &args(&["second", "one"])),
            args(&["--o", "val", "one", "rest"])
        );
    }

    #[test]
    fn test_split_for_plugin_no_occurrence() {
        let argv = args(&["a", "b"]);
        assert_eq!(split_for_plugin(&argv, &args(&["z"])), argv);
        assert_eq!(split_for_plugin(&argv, &[]), argv);
    }

    #[test]
    fn test_boolean_pair_conflict() {
        let err = check_boolean_pairs(&args(&["--verbose", "--no-verbose"])).unwrap_err();
        assert!(err.to_string().contains("only one of"));
        assert!(err.to_string().contains("'--verbose' and '--no-verbose'"));
    }

    #[test]
    fn test_boolean_pairs_ok() {
        assert!(check_boolean_pairs(&args(&["--verbose", "--no-wait", "x"])).is_ok());
        assert!(check_boolean_pairs(&args(&["--no-verbose"])).is_ok());
        assert!(check_boolean_pairs(&args(&["--wait=true", "--no-wait"])).is_err());
    }

    #[test]
    fn test_validate_unknown_sub_command() {
        let tree = sample_tree();
        let err = ArgumentRewriter::new()
            .validate_against_tree(&tree, &args(&["service", "foo"]))
            .unwrap_err();
        let msg = err.to_string();
        for needle in ["unknown sub-command", "foo", "create", "delete", "list"] {
            assert!(msg.contains(needle), "missing {} in {}", needle, msg);
        }
    }

    #[test]
    fn test_validate_accepts_leaf_and_bare_group() {
        let tree = sample_tree();
        let rw = ArgumentRewriter::new();
        assert!(rw
            .validate_against_tree(&tree, &args(&["service", "create", "x"]))
            .is_ok());
        assert!(rw.validate_against_tree(&tree, &args(&["service"])).is_ok());
    }

    #[test]
    fn test_classify_builtin_leaf_wins() {
        let tree = sample_tree();
        let catalog = catalog(&["kn-service-create"]);
        let argv = args(&["--config", "/c", "service", "create", "hello", "--image", "img"]);
        match ArgumentRewriter::new().classify(&tree, &catalog, &argv) {
            Invocation::Leaf { node, path, args: leaf_args } => {
                assert_eq!(node.verb(), "create");
                assert_eq!(path, args(&["service", "create"]));
                assert_eq!(leaf_args, args(&["hello", "--image", "img"]));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_plugin_extending_group() {
        let tree = sample_tree();
        let catalog = catalog(&["kn-service-log"]);
        match ArgumentRewriter::new().classify(&tree, &catalog, &args(&["service", "log", "x"])) {
            Invocation::Plugin(m) => {
                assert_eq!(m.name, "kn-service-log");
                assert_eq!(m.args, args(&["x"]));
            }
            other => panic!("expected plugin, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_plugin_never_replaces_group() {
        let tree = sample_tree();
        let catalog = catalog(&["kn-service"]);
        match ArgumentRewriter::new().classify(&tree, &catalog, &args(&["service", "foo"])) {
            Invocation::Group { path, remaining, .. } => {
                assert_eq!(path, args(&["service"]));
                assert_eq!(remaining, args(&["foo"]));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_top_level_plugin() {
        let tree = sample_tree();
        let catalog = catalog(&["kn-admin"]);
        assert!(matches!(
            ArgumentRewriter::new().classify(&tree, &catalog, &args(&["admin", "--x"])),
            Invocation::Plugin(_)
        ));
        assert!(matches!(
            ArgumentRewriter::new().classify(&tree, &catalog, &args(&["nope"])),
            Invocation::Group { .. }
        ));
    }
}
