//! The static tree of built-in verbs.
//!
//! Groups only route to their children; leaves carry a [`Runner`]. The tree
//! is validated once at startup and then walked by longest-prefix match.

use std::fmt;
use std::io::Write;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::ResourceClient;
use crate::config::Config;
use crate::error::{KnError, Result};
use crate::plugins::{ContextManager, FileClassifier, PluginCatalog};

/// Name of the root node, used as the first word of command paths.
pub const ROOT_VERB: &str = "kn";

/// Everything a leaf runner may touch during one invocation.
pub struct CommandContext<'a> {
    pub config: &'a mut Config,
    pub catalog: &'a PluginCatalog,
    pub context: &'a mut ContextManager,
    pub tree: &'a CommandTree,
    pub client: &'a dyn ResourceClient,
    pub classifier: &'a dyn FileClassifier,
    pub cancel: CancellationToken,
    pub out: &'a mut (dyn Write + Send),
}

/// The executable part of a leaf command.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run with the arguments left after the command path and the bootstrap
    /// flags have been removed.
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()>;
}

/// A node of the command tree.
pub struct CommandNode {
    verb: String,
    short: String,
    children: Vec<CommandNode>,
    runner: Option<Box<dyn Runner>>,
}

impl CommandNode {
    /// A group routing to `children`.
    pub fn group(verb: &str, short: &str, children: Vec<CommandNode>) -> Self {
        Self {
            verb: verb.to_string(),
            short: short.to_string(),
            children,
            runner: None,
        }
    }

    /// An executable leaf.
    pub fn leaf(verb: &str, short: &str, runner: impl Runner + 'static) -> Self {
        Self {
            verb: verb.to_string(),
            short: short.to_string(),
            children: Vec::new(),
            runner: Some(Box::new(runner)),
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn runner(&self) -> Option<&dyn Runner> {
        self.runner.as_deref()
    }

    /// A leaf has a runner and no children.
    pub fn is_leaf(&self) -> bool {
        self.runner.is_some() && self.children.is_empty()
    }

    pub fn child(&self, verb: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.verb == verb)
    }

    /// Child verbs in sorted order.
    pub fn child_verbs(&self) -> Vec<String> {
        let mut verbs: Vec<String> = self.children.iter().map(|c| c.verb.clone()).collect();
        verbs.sort();
        verbs
    }

    fn validate(&self, path: &str) -> Result<()> {
        match (&self.runner, self.children.is_empty()) {
            (Some(_), false) => {
                return Err(KnError::Internal(format!(
                    "command group '{}' must not have a runner",
                    path
                )))
            }
            (None, true) => {
                return Err(KnError::Internal(format!(
                    "command '{}' has neither a runner nor sub-commands",
                    path
                )))
            }
            _ => {}
        }

        let mut seen = std::collections::HashSet::new();
        for child in &self.children {
            if child.verb.is_empty() || child.verb.starts_with('-') {
                return Err(KnError::Internal(format!(
                    "invalid verb '{}' under '{}'",
                    child.verb, path
                )));
            }
            if !seen.insert(child.verb.as_str()) {
                return Err(KnError::Internal(format!(
                    "duplicate sub-command '{}' under '{}'",
                    child.verb, path
                )));
            }
            child.validate(&format!("{} {}", path, child.verb))?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("verb", &self.verb)
            .field("leaf", &self.is_leaf())
            .field("children", &self.children)
            .finish()
    }
}

/// Result of walking the tree with a token list.
#[derive(Debug)]
pub struct TreeMatch<'t, 'a> {
    /// Deepest node reached (the root when nothing matched).
    pub node: &'t CommandNode,
    /// Tokens consumed on the way down.
    pub path: &'a [String],
    /// Tokens after the deepest matched node.
    pub remaining: &'a [String],
}

impl TreeMatch<'_, '_> {
    /// Whether at least one token matched a built-in verb.
    pub fn matched(&self) -> bool {
        !self.path.is_empty()
    }

    /// Full command path, e.g. `kn service create`.
    pub fn command_path(&self) -> String {
        command_path(self.path)
    }
}

/// `kn` followed by the given verbs.
pub fn command_path(verbs: &[String]) -> String {
    std::iter::once(ROOT_VERB)
        .chain(verbs.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The validated tree of built-in commands.
#[derive(Debug)]
pub struct CommandTree {
    root: CommandNode,
}

impl CommandTree {
    /// Build and validate a tree from top-level commands.
    pub fn new(commands: Vec<CommandNode>) -> Result<Self> {
        let tree = Self {
            root: CommandNode::group(ROOT_VERB, "", commands),
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Every node is a group (no runner, at least one child) or a leaf
    /// (runner, no children); sibling verbs are unique.
    pub fn validate(&self) -> Result<()> {
        self.root.validate(ROOT_VERB)
    }

    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    /// Longest-prefix match of `tokens` against the tree.
    pub fn find<'t, 'a>(&'t self, tokens: &'a [String]) -> TreeMatch<'t, 'a> {
        let mut node = &self.root;
        let mut depth = 0;
        for token in tokens {
            match node.child(token) {
                Some(child) => {
                    node = child;
                    depth += 1;
                }
                None => break,
            }
            if node.is_leaf() {
                break;
            }
        }
        TreeMatch {
            node,
            path: &tokens[..depth],
            remaining: &tokens[depth..],
        }
    }

    /// The node at exactly `parts`, if every part matches.
    pub fn node_at(&self, parts: &[String]) -> Option<&CommandNode> {
        let m = self.find(parts);
        if m.remaining.is_empty() && m.matched() {
            Some(m.node)
        } else {
            None
        }
    }

    /// The error for a group reached without a runnable child.
    pub fn group_error(&self, found: &TreeMatch<'_, '_>) -> KnError {
        let parent = found.command_path();
        let children = found.node.child_verbs();
        match found.remaining.first() {
            Some(token) => KnError::UnknownSubCommand {
                token: token.clone(),
                parent,
                children,
            },
            None => KnError::NoSubCommand { parent, children },
        }
    }

    /// Human readable listing of a group's children, used for `--help`.
    pub fn group_help(&self, node: &CommandNode, path: &[String]) -> String {
        let mut out = format!("{}\n\nAvailable sub-commands:\n", command_path(path));
        let mut children: Vec<&CommandNode> = node.children.iter().collect();
        children.sort_by(|a, b| a.verb.cmp(&b.verb));
        let width = children.iter().map(|c| c.verb.len()).max().unwrap_or(0);
        for child in children {
            out.push_str(&format!(
                "  {:width$}  {}\n",
                child.verb,
                child.short,
                width = width
            ));
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct NoopRunner;

    #[async_trait]
    impl Runner for NoopRunner {
        async fn run(&self, _ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<()> {
            Ok(())
        }
    }

    /// `service {create, delete, list}` plus `source {list}`.
    pub(crate) fn sample_tree() -> CommandTree {
        CommandTree::new(vec![
            CommandNode::group(
                "service",
                "Manage services",
                vec![
                    CommandNode::leaf("list", "List services", NoopRunner),
                    CommandNode::leaf("create", "Create a service", NoopRunner),
                    CommandNode::leaf("delete", "Delete a service", NoopRunner),
                ],
            ),
            CommandNode::group(
                "source",
                "Manage event sources",
                vec![CommandNode::leaf("list", "List sources", NoopRunner)],
            ),
        ])
        .unwrap()
    }

    fn toks(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_leaf_with_trailing_args() {
        let tree = sample_tree();
        let tokens = toks(&["service", "create", "hello", "extra"]);
        let m = tree.find(&tokens);
        assert!(m.node.is_leaf());
        assert_eq!(m.node.verb(), "create");
        assert_eq!(m.path, &toks(&["service", "create"])[..]);
        assert_eq!(m.remaining, &toks(&["hello", "extra"])[..]);
        assert_eq!(m.command_path(), "kn service create");
    }

    #[test]
    fn test_find_stops_at_group() {
        let tree = sample_tree();
        let tokens = toks(&["service", "foo"]);
        let m = tree.find(&tokens);
        assert_eq!(m.node.verb(), "service");
        assert!(!m.node.is_leaf());
        assert_eq!(m.remaining, &toks(&["foo"])[..]);
        assert!(m.matched());
    }

    #[test]
    fn test_find_nothing() {
        let tree = sample_tree();
        let tokens = toks(&["kafka"]);
        let m = tree.find(&tokens);
        assert_eq!(m.node.verb(), ROOT_VERB);
        assert!(!m.matched());
    }

    #[test]
    fn test_unknown_sub_command_lists_sorted_children() {
        let tree = sample_tree();
        let tokens = toks(&["service", "foo"]);
        let err = tree.group_error(&tree.find(&tokens));
        let msg = err.to_string();
        assert!(msg.contains("unknown sub-command"));
        assert!(msg.contains("'foo'"));
        assert!(msg.contains("'kn service'"));
        assert!(msg.ends_with("create, delete, list"));
    }

    #[test]
    fn test_no_sub_command_given() {
        let tree = sample_tree();
        let tokens = toks(&["source"]);
        let err = tree.group_error(&tree.find(&tokens));
        assert_eq!(
            err.to_string(),
            "no sub-command given for 'kn source'. Available sub-commands: list"
        );
    }

    #[test]
    fn test_node_at() {
        let tree = sample_tree();
        assert!(tree.node_at(&toks(&["service"])).is_some());
        assert!(tree.node_at(&toks(&["service", "list"])).is_some());
        assert!(tree.node_at(&toks(&["service", "log"])).is_none());
        assert!(tree.node_at(&[]).is_none());
    }

    #[test]
    fn test_every_node_is_group_or_leaf() {
        fn check(node: &CommandNode) {
            if node.is_leaf() {
                assert!(node.children().is_empty());
            } else {
                assert!(node.runner().is_none());
                assert!(!node.children().is_empty());
                node.children().iter().for_each(check);
            }
        }
        check(sample_tree().root());
    }

    #[test]
    fn test_group_with_runner_is_rejected() {
        let mut bad = CommandNode::group(
            "service",
            "",
            vec![CommandNode::leaf("list", "", NoopRunner)],
        );
        bad.runner = Some(Box::new(NoopRunner));
        let err = CommandTree::new(vec![bad]).unwrap_err();
        assert!(matches!(err, KnError::Internal(_)));
    }

    #[test]
    fn test_empty_group_is_rejected() {
        let err = CommandTree::new(vec![CommandNode::group("service", "", vec![])]).unwrap_err();
        assert!(err.to_string().contains("neither a runner nor sub-commands"));
    }

    #[test]
    fn test_duplicate_verbs_are_rejected() {
        let err = CommandTree::new(vec![
            CommandNode::leaf("version", "", NoopRunner),
            CommandNode::leaf("version", "", NoopRunner),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate sub-command 'version'"));
    }

    #[test]
    fn test_group_help_is_sorted() {
        let tree = sample_tree();
        let service = tree.root().child("service").unwrap();
        let help = tree.group_help(service, &toks(&["service"]));
        let create = help.find("create").unwrap();
        let delete = help.find("delete").unwrap();
        let list = help.find("list").unwrap();
        assert!(create < delete && delete < list);
        assert!(help.starts_with("kn service"));
    }
}
