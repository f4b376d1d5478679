//! `kn plugin list`

use async_trait::async_trait;
use clap::Parser;

use crate::error::{KnError, Result};
use crate::plugins::{Location, PluginDescriptor, PluginVerifier};

use super::tree::{CommandContext, CommandNode, Runner};
use super::{parse_args, path_of};

#[derive(Parser, Debug)]
struct ListArgs {
    /// Show shadowed plugins, verification results and manifests
    #[arg(long)]
    verbose: bool,

    /// Print only plugin names
    #[arg(long)]
    name_only: bool,
}

/// The `plugin` group.
pub fn plugin_group() -> CommandNode {
    CommandNode::group(
        "plugin",
        "Manage kn plugins",
        vec![CommandNode::leaf(
            "list",
            "List plugins available to kn",
            PluginListCommand,
        )],
    )
}

pub struct PluginListCommand;

#[async_trait]
impl Runner for PluginListCommand {
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(opts) = parse_args::<ListArgs>(&path_of(&["plugin", "list"]), args, ctx.out)?
        else {
            return Ok(());
        };

        let shown: Vec<&PluginDescriptor> = ctx
            .catalog
            .list()
            .iter()
            .filter(|d| opts.verbose || d.is_active())
            .collect();

        if opts.name_only {
            for d in &shown {
                writeln!(ctx.out, "{}", d.name)?;
            }
            return Ok(());
        }

        if shown.is_empty() {
            writeln!(
                ctx.out,
                "No plugins found in path '{}'.",
                ctx.config.plugins_dir().display()
            )?;
        } else {
            writeln!(ctx.out, "The following plugins are available, using options:")?;
            writeln!(ctx.out, "  - plugins dir: '{}'", ctx.config.plugins_dir().display())?;
            writeln!(
                ctx.out,
                "  - lookup plugins in $PATH: '{}'",
                ctx.config.lookup_plugins_in_path()
            )?;
            writeln!(ctx.out)?;
        }

        if !opts.verbose {
            for d in &shown {
                writeln!(ctx.out, "- {} : {}", d.name, d.location)?;
            }
            return Ok(());
        }

        let manifests = ctx.context.manifests(ctx.catalog).await;
        let verifier = PluginVerifier::new(ctx.tree, ctx.classifier);
        let mut failed = 0;

        for d in &shown {
            match &d.shadowed_by {
                Some(winner) => writeln!(
                    ctx.out,
                    "- {} : {} (shadowed by {})",
                    d.name, d.location, winner
                )?,
                None => writeln!(ctx.out, "- {} : {}", d.name, d.location)?,
            }
            if d.location == Location::Inlined && !d.description.is_empty() {
                writeln!(ctx.out, "  {}", d.description)?;
            }

            let verification = verifier.verify(d);
            for warning in &verification.warnings {
                writeln!(ctx.out, "  - WARNING: {}", warning)?;
            }
            for error in &verification.errors {
                writeln!(ctx.out, "  - ERROR: {}", error)?;
            }
            if !verification.is_ok() {
                failed += 1;
            }

            if d.is_active() {
                if let Some(m) = manifests.get(&d.name) {
                    if !m.produces_keys.is_empty() {
                        let keys: Vec<&str> = m.produces_keys.iter().map(String::as_str).collect();
                        writeln!(ctx.out, "  produces: {}", keys.join(", "))?;
                    }
                    if !m.consumes_keys.is_empty() {
                        let keys: Vec<&str> = m.consumes_keys.iter().map(String::as_str).collect();
                        writeln!(ctx.out, "  consumes: {}", keys.join(", "))?;
                    }
                }
            }
        }

        for warning in ctx.catalog.warnings() {
            writeln!(ctx.out, "WARNING: {}", warning)?;
        }

        if failed > 0 {
            return Err(KnError::PluginCatalog(format!(
                "{} plugin(s) failed verification",
                failed
            )));
        }
        Ok(())
    }
}
