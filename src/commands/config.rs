//! `kn config`: scalar keys and the eventing mapping lists.
//!
//! Changes are made on the in-memory [`Config`](crate::config::Config); the
//! root command writes the file once the command has succeeded.

use std::io::Write;

use async_trait::async_trait;
use clap::Parser;

use crate::config::mappings::{self, Mapping};
use crate::config::{
    ChannelTypeMapping, Config, ConfigKey, ConfigValue, MappingList, SinkMapping,
};
use crate::error::{KnError, Result};

use super::tree::{CommandContext, CommandNode, Runner};
use super::{parse_args, path_of};

/// The `config` group.
pub fn config_group() -> CommandNode {
    CommandNode::group(
        "config",
        "Manage kn configuration",
        vec![
            CommandNode::leaf("get", "Print a configuration value", GetCommand),
            CommandNode::leaf("set", "Set a scalar configuration value", SetCommand),
            mapping_group(MappingKind::Sink),
            mapping_group(MappingKind::ChannelType),
        ],
    )
}

fn mapping_group(kind: MappingKind) -> CommandNode {
    let leaves = [
        (Action::Add, "add", "Add a new mapping"),
        (Action::Update, "update", "Update an existing mapping"),
        (Action::Delete, "delete", "Delete a mapping"),
        (Action::List, "list", "List mappings"),
    ]
    .into_iter()
    .map(|(action, verb, short)| CommandNode::leaf(verb, short, MappingCommand { kind, action }))
    .collect();
    CommandNode::group(kind.verb(), kind.short(), leaves)
}

// ---------------------------------------------------------------------------
// get / set
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
struct GetArgs {
    /// Key such as plugins.directory or eventing.sink-mappings
    key: String,
}

#[derive(Parser, Debug)]
struct SetArgs {
    /// Scalar key such as plugins.directory or plugins.path-lookup
    key: String,
    /// New value
    value: String,
}

struct GetCommand;

#[async_trait]
impl Runner for GetCommand {
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(opts) = parse_args::<GetArgs>(&path_of(&["config", "get"]), args, ctx.out)?
        else {
            return Ok(());
        };
        let key: ConfigKey = opts.key.parse()?;
        match ctx.config.effective(key) {
            ConfigValue::String(s) => writeln!(ctx.out, "{}", s)?,
            ConfigValue::Bool(b) => writeln!(ctx.out, "{}", b)?,
            ConfigValue::List(MappingList::Sink(list)) => {
                write!(ctx.out, "{}", serde_yaml_bw::to_string(&list)?)?
            }
            ConfigValue::List(MappingList::ChannelType(list)) => {
                write!(ctx.out, "{}", serde_yaml_bw::to_string(&list)?)?
            }
        }
        Ok(())
    }
}

struct SetCommand;

#[async_trait]
impl Runner for SetCommand {
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(opts) = parse_args::<SetArgs>(&path_of(&["config", "set"]), args, ctx.out)?
        else {
            return Ok(());
        };
        ctx.config.set_from_str(&opts.key, &opts.value)?;
        writeln!(ctx.out, "Updated '{}'.", opts.key)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mapping lists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MappingKind {
    Sink,
    ChannelType,
}

impl MappingKind {
    fn verb(&self) -> &'static str {
        match self {
            MappingKind::Sink => "sink-mapping",
            MappingKind::ChannelType => "channel-type",
        }
    }

    fn short(&self) -> &'static str {
        match self {
            MappingKind::Sink => "Manage sink prefix mappings",
            MappingKind::ChannelType => "Manage channel type aliases",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MappingKind::Sink => "sink mapping",
            MappingKind::ChannelType => "channel type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Update,
    Delete,
    List,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::List => "list",
        }
    }
}

#[derive(Parser, Debug)]
struct SinkMappingArgs {
    /// Prefix used in sink references (prefix:name)
    #[arg(long)]
    prefix: String,
    /// Plural resource name, e.g. services
    #[arg(long)]
    resource: Option<String>,
    /// API group of the resource
    #[arg(long)]
    group: Option<String>,
    /// API version of the resource
    #[arg(long)]
    version: Option<String>,
}

#[derive(Parser, Debug)]
struct ChannelTypeArgs {
    /// Alias used with --type
    #[arg(long)]
    alias: String,
    /// Channel kind, e.g. KafkaChannel
    #[arg(long)]
    kind: Option<String>,
    /// API group of the kind
    #[arg(long)]
    group: Option<String>,
    /// API version of the kind
    #[arg(long)]
    version: Option<String>,
}

#[derive(Parser, Debug)]
struct SinkDeleteArgs {
    #[arg(long)]
    prefix: String,
}

#[derive(Parser, Debug)]
struct ChannelTypeDeleteArgs {
    #[arg(long)]
    alias: String,
}

#[derive(Parser, Debug)]
struct NoArgs {}

/// `kn config <sink-mapping|channel-type> <action>`
struct MappingCommand {
    kind: MappingKind,
    action: Action,
}

/// Take `given`, or the existing entry's value on update.
fn field(given: Option<String>, existing: Option<&str>, flag: &str) -> Result<String> {
    given
        .or_else(|| existing.map(str::to_string))
        .ok_or_else(|| KnError::UserInput(format!("flag '--{}' is required", flag)))
}

impl MappingCommand {
    fn path(&self) -> Vec<String> {
        path_of(&["config", self.kind.verb(), self.action.verb()])
    }

    async fn run_sink(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let path = self.path();
        let current = ctx.config.sink_mappings();
        match self.action {
            Action::List => {
                if parse_args::<NoArgs>(&path, args, ctx.out)?.is_none() {
                    return Ok(());
                }
                let rows = current
                    .iter()
                    .map(|m| {
                        [
                            m.prefix.as_str(),
                            m.resource.as_str(),
                            m.group.as_str(),
                            m.version.as_str(),
                        ]
                    })
                    .collect::<Vec<_>>();
                print_table(ctx.out, ["PREFIX", "RESOURCE", "GROUP", "VERSION"], &rows)
            }
            Action::Delete => {
                let Some(opts) = parse_args::<SinkDeleteArgs>(&path, args, ctx.out)? else {
                    return Ok(());
                };
                self.delete(ctx, &current, &opts.prefix, |c, alias| {
                    c.mutate_sink_mappings(|l| Ok(mappings::delete(l, alias)))
                })
            }
            Action::Add | Action::Update => {
                let Some(opts) = parse_args::<SinkMappingArgs>(&path, args, ctx.out)? else {
                    return Ok(());
                };
                let existing = match self.action {
                    Action::Update => Some(
                        mappings::find(&current, &opts.prefix)
                            .ok_or_else(|| KnError::AliasNotFound(opts.prefix.clone()))?,
                    ),
                    _ => None,
                };
                let entry = SinkMapping {
                    prefix: opts.prefix.clone(),
                    resource: field(
                        opts.resource,
                        existing.map(|e| e.resource.as_str()),
                        "resource",
                    )?,
                    group: field(opts.group, existing.map(|e| e.group.as_str()), "group")?,
                    version: field(
                        opts.version,
                        existing.map(|e| e.version.as_str()),
                        "version",
                    )?,
                };
                let action = self.action;
                ctx.config.mutate_sink_mappings(|l| match action {
                    Action::Add => mappings::add(l, entry),
                    _ => mappings::update(l, entry),
                })?;
                self.report(ctx, &opts.prefix)
            }
        }
    }

    async fn run_channel_type(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let path = self.path();
        let current = ctx.config.channel_type_mappings();
        match self.action {
            Action::List => {
                if parse_args::<NoArgs>(&path, args, ctx.out)?.is_none() {
                    return Ok(());
                }
                let rows = current
                    .iter()
                    .map(|m| {
                        [
                            m.alias.as_str(),
                            m.kind.as_str(),
                            m.group.as_str(),
                            m.version.as_str(),
                        ]
                    })
                    .collect::<Vec<_>>();
                print_table(ctx.out, ["ALIAS", "KIND", "GROUP", "VERSION"], &rows)
            }
            Action::Delete => {
                let Some(opts) = parse_args::<ChannelTypeDeleteArgs>(&path, args, ctx.out)? else {
                    return Ok(());
                };
                self.delete(ctx, &current, &opts.alias, |c, alias| {
                    c.mutate_channel_type_mappings(|l| Ok(mappings::delete(l, alias)))
                })
            }
            Action::Add | Action::Update => {
                let Some(opts) = parse_args::<ChannelTypeArgs>(&path, args, ctx.out)? else {
                    return Ok(());
                };
                let existing = match self.action {
                    Action::Update => Some(
                        mappings::find(&current, &opts.alias)
                            .ok_or_else(|| KnError::AliasNotFound(opts.alias.clone()))?,
                    ),
                    _ => None,
                };
                let entry = ChannelTypeMapping {
                    alias: opts.alias.clone(),
                    kind: field(opts.kind, existing.map(|e| e.kind.as_str()), "kind")?,
                    group: field(opts.group, existing.map(|e| e.group.as_str()), "group")?,
                    version: field(
                        opts.version,
                        existing.map(|e| e.version.as_str()),
                        "version",
                    )?,
                };
                let action = self.action;
                ctx.config.mutate_channel_type_mappings(|l| match action {
                    Action::Add => mappings::add(l, entry),
                    _ => mappings::update(l, entry),
                })?;
                self.report(ctx, &opts.alias)
            }
        }
    }

    /// Delete `alias`, reporting an unknown alias as a user error.
    fn delete<M, F>(
        &self,
        ctx: &mut CommandContext<'_>,
        current: &[M],
        alias: &str,
        apply: F,
    ) -> Result<()>
    where
        M: Mapping,
        F: FnOnce(&mut Config, &str) -> Result<()>,
    {
        if mappings::find(current, alias).is_none() {
            return Err(KnError::AliasNotFound(alias.to_string()));
        }
        apply(ctx.config, alias)?;
        self.report(ctx, alias)
    }

    fn report(&self, ctx: &mut CommandContext<'_>, alias: &str) -> Result<()> {
        let done = match self.action {
            Action::Add => "added",
            Action::Update => "updated",
            Action::Delete => "deleted",
            Action::List => return Ok(()),
        };
        writeln!(ctx.out, "The {} '{}' has been {}.", self.kind.label(), alias, done)?;
        Ok(())
    }
}

#[async_trait]
impl Runner for MappingCommand {
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        match self.kind {
            MappingKind::Sink => self.run_sink(ctx, args).await,
            MappingKind::ChannelType => self.run_channel_type(ctx, args).await,
        }
    }
}

/// Left-aligned columns separated by two spaces.
fn print_table<const N: usize>(
    out: &mut (dyn Write + Send),
    header: [&str; N],
    rows: &[[&str; N]],
) -> Result<()> {
    let mut widths = header.map(str::len);
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }
    let line = |cells: &[&str; N]| {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{:w$}", c, w = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    writeln!(out, "{}", line(&header))?;
    for row in rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}
