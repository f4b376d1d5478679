//! Built-in commands.
//!
//! Each leaf parses its own arguments with a `clap` derive struct. The tree
//! itself is assembled here and validated once per invocation.

pub mod config;
pub mod plugin;
pub mod resource;
pub mod tree;

use std::io::Write;

use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::Parser;

use crate::client::{Operation, ResourceKind};
use crate::error::{KnError, Result};

pub use tree::{CommandContext, CommandNode, CommandTree, Runner, TreeMatch, ROOT_VERB};

use resource::ResourceCommand;

/// Parse leaf arguments with `T`.
///
/// Returns `None` after printing help when `--help` was requested. Parse
/// failures become `UserInput` errors carrying clap's message.
pub(crate) fn parse_args<T: Parser>(
    path: &[String],
    args: &[String],
    out: &mut (dyn Write + Send),
) -> Result<Option<T>> {
    let argv = std::iter::once(tree::command_path(path)).chain(args.iter().cloned());
    match T::try_parse_from(argv) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            write!(out, "{}", e.render())?;
            Ok(None)
        }
        Err(e) => Err(KnError::UserInput(
            e.render().to_string().trim_end().to_string(),
        )),
    }
}

/// Owned verb list for a command path.
pub(crate) fn path_of(verbs: &[&str]) -> Vec<String> {
    verbs.iter().map(|v| v.to_string()).collect()
}

/// `kn version`
#[derive(Parser, Debug)]
struct VersionArgs {}

struct VersionCommand;

#[async_trait]
impl Runner for VersionCommand {
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        if parse_args::<VersionArgs>(&path_of(&["version"]), args, ctx.out)?.is_none() {
            return Ok(());
        }
        writeln!(ctx.out, "Version: {}", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }
}

fn resource_group(kind: ResourceKind, verb: &str, short: &str, create: bool) -> CommandNode {
    let mut leaves = Vec::new();
    if create {
        leaves.push(CommandNode::leaf(
            "create",
            &format!("Create a {}", verb),
            ResourceCommand::new(kind, Operation::Create),
        ));
    }
    leaves.push(CommandNode::leaf(
        "delete",
        &format!("Delete a {}", verb),
        ResourceCommand::new(kind, Operation::Delete),
    ));
    leaves.push(CommandNode::leaf(
        "describe",
        &format!("Show details of a {}", verb),
        ResourceCommand::new(kind, Operation::Describe),
    ));
    leaves.push(CommandNode::leaf(
        "list",
        &format!("List {}", kind.plural()),
        ResourceCommand::new(kind, Operation::List),
    ));
    CommandNode::group(verb, short, leaves)
}

/// The full tree of built-in commands.
pub fn build_command_tree() -> Result<CommandTree> {
    CommandTree::new(vec![
        resource_group(ResourceKind::Service, "service", "Manage Knative services", true),
        resource_group(ResourceKind::Revision, "revision", "Manage service revisions", false),
        resource_group(ResourceKind::Route, "route", "List and describe service routes", false),
        resource_group(ResourceKind::Trigger, "trigger", "Manage event triggers", true),
        resource_group(ResourceKind::Broker, "broker", "Manage message brokers", true),
        resource_group(ResourceKind::Channel, "channel", "Manage event channels", true),
        resource_group(ResourceKind::Source, "source", "Manage event sources", true),
        resource_group(ResourceKind::Domain, "domain", "Manage domain mappings", true),
        plugin::plugin_group(),
        config::config_group(),
        CommandNode::leaf("version", "Show the version of this client", VersionCommand),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_tree_is_valid() {
        let tree = build_command_tree().unwrap();
        let verbs = tree.root().child_verbs();
        for verb in ["service", "source", "plugin", "config", "version"] {
            assert!(verbs.contains(&verb.to_string()), "missing {}", verb);
        }
    }

    #[test]
    fn test_revision_and_route_have_no_create() {
        let tree = build_command_tree().unwrap();
        for group in ["revision", "route"] {
            let node = tree.root().child(group).unwrap();
            assert!(node.child("create").is_none());
            assert!(node.child("list").is_some());
        }
        assert!(tree
            .root()
            .child("service")
            .unwrap()
            .child("create")
            .is_some());
    }

    #[derive(Parser, Debug)]
    struct Sample {
        name: String,
        #[arg(long)]
        verbose: bool,
    }

    #[test]
    fn test_parse_args_success_and_failure() {
        let mut out = Vec::new();
        let path = path_of(&["sample"]);
        let parsed = parse_args::<Sample>(&path, &path_of(&["x", "--verbose"]), &mut out)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.name, "x");
        assert!(parsed.verbose);

        let err = parse_args::<Sample>(&path, &[], &mut out).unwrap_err();
        assert!(matches!(err, KnError::UserInput(_)));
    }

    #[test]
    fn test_parse_args_help_prints_usage() {
        let mut out = Vec::new();
        let path = path_of(&["sample"]);
        let parsed = parse_args::<Sample>(&path, &path_of(&["--help"]), &mut out).unwrap();
        assert!(parsed.is_none());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Usage: kn sample"));
    }
}
