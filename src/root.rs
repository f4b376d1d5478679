//! The `kn` root command.
//!
//! One [`Root::run`] call handles one command line: bootstrap flags are read,
//! configuration is loaded, the command tree and the plugin catalog are
//! built, and the invocation is routed to a built-in leaf, a plugin or a
//! group help page. Configuration and the context cache are persisted only
//! when the invocation succeeds and was not interrupted.

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::{check_boolean_pairs, ArgumentRewriter, BootstrapFlags, Invocation};
use crate::client::{DryRunClient, ResourceClient};
use crate::commands::tree::command_path;
use crate::commands::{build_command_tree, CommandContext, CommandTree, TreeMatch, ROOT_VERB};
use crate::config::{Config, Env};
use crate::error::{ErrorCategory, KnError, Result};
use crate::plugins::{
    ContextManager, DispatchOutcome, FileClassifier, InlinedRegistry, PluginCatalog,
    PluginDispatcher, PluginVerifier, ProcessLauncher,
};

/// Builds the API client once the bootstrap flags are known.
pub type ClientFactory = Box<dyn Fn(&BootstrapFlags) -> Arc<dyn ResourceClient> + Send + Sync>;

/// Everything that stays fixed across invocations.
pub struct Root {
    env: Env,
    registry: InlinedRegistry,
    classifier: Box<dyn FileClassifier>,
    dispatcher: PluginDispatcher,
    rewriter: ArgumentRewriter,
    client_factory: ClientFactory,
    cancel: CancellationToken,
}

impl Root {
    pub fn new(
        env: Env,
        classifier: Box<dyn FileClassifier>,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            env,
            registry: InlinedRegistry::new(),
            classifier,
            dispatcher: PluginDispatcher::new(launcher),
            rewriter: ArgumentRewriter::new(),
            client_factory: Box::new(|flags: &BootstrapFlags| -> Arc<dyn ResourceClient> {
                Arc::new(DryRunClient::new(flags.kubeconfig.clone(), flags.log_http))
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Use these in-process plugins.
    pub fn with_inlined(mut self, registry: InlinedRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_client_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&BootstrapFlags) -> Arc<dyn ResourceClient> + Send + Sync + 'static,
    {
        self.client_factory = Box::new(factory);
        self
    }

    /// Token cancelled when the invocation should stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one command line (without the program name).
    pub async fn run(&self, argv: &[String], out: &mut (dyn Write + Send)) -> Result<()> {
        let flags = BootstrapFlags::parse(argv)?;
        let mut config = Config::load(&flags, &self.env)?;
        let loaded = config.file().clone();
        let tree = build_command_tree()?;
        let catalog =
            PluginCatalog::build(&config, &self.registry, self.classifier.as_ref(), &self.env);
        report_unusable_plugins(&tree, &catalog, self.classifier.as_ref());
        let mut context = ContextManager::load(&config.dir());

        self.route(&flags, &mut config, &tree, &catalog, &mut context, argv, out)
            .await?;

        if self.cancel.is_cancelled() {
            info!("Invocation interrupted, not saving state");
            return Err(KnError::Cancelled);
        }
        if config.file() != &loaded {
            config.save()?;
        }
        context.write_cache();
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn route(
        &self,
        flags: &BootstrapFlags,
        config: &mut Config,
        tree: &CommandTree,
        catalog: &PluginCatalog,
        context: &mut ContextManager,
        argv: &[String],
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        let invocation = self.rewriter.classify(tree, catalog, argv);
        check_boolean_pairs(&host_tokens(&invocation, argv))?;
        match invocation {
            Invocation::Leaf { node, path, args } => {
                let runner = node.runner().ok_or_else(|| {
                    KnError::Internal(format!("'{}' has no runner", command_path(&path)))
                })?;
                let client = (self.client_factory)(flags);
                debug!(command = %command_path(&path), "Running built-in command");
                let mut ctx = CommandContext {
                    config,
                    catalog,
                    context,
                    tree,
                    client: client.as_ref(),
                    classifier: self.classifier.as_ref(),
                    cancel: self.cancel.clone(),
                    out,
                };
                runner.run(&mut ctx, &args).await
            }
            Invocation::Plugin(found) => {
                let outcome = self
                    .dispatcher
                    .invoke(catalog, &found, context, self.cancel.clone())
                    .await?;
                debug!(plugin = %found.name, outcome = ?outcome, "Plugin finished");
                match outcome {
                    DispatchOutcome::NoMatch => Err(KnError::Internal(format!(
                        "plugin '{}' did not run",
                        found.name
                    ))),
                    DispatchOutcome::Invoked(_) | DispatchOutcome::Replaced => Ok(()),
                }
            }
            Invocation::Group {
                node,
                path,
                remaining,
            } => {
                // a bare `kn` shows the top-level help
                if flags.help || (path.is_empty() && remaining.is_empty()) {
                    write!(out, "{}", tree.group_help(node, &path))?;
                    return Ok(());
                }
                Err(tree.group_error(&TreeMatch {
                    node,
                    path: &path,
                    remaining: &remaining,
                }))
            }
        }
    }
}

/// Tokens of `argv` that belong to `kn` itself. A plugin's own arguments
/// start at its first matched token and are left alone.
fn host_tokens(invocation: &Invocation<'_>, argv: &[String]) -> Vec<String> {
    match invocation {
        Invocation::Leaf { args, .. } => args.clone(),
        Invocation::Plugin(found) => {
            let end = found
                .matched
                .first()
                .and_then(|first| argv.iter().position(|t| t == first))
                .unwrap_or(argv.len());
            argv[..end].to_vec()
        }
        Invocation::Group { .. } => argv.to_vec(),
    }
}

/// Log every catalog entry that cannot be used. Returns the error count.
fn report_unusable_plugins(
    tree: &CommandTree,
    catalog: &PluginCatalog,
    classifier: &dyn FileClassifier,
) -> usize {
    let mut count = 0;
    for verification in PluginVerifier::new(tree, classifier).verify_all(catalog) {
        for error in &verification.errors {
            warn!(plugin = %verification.name, error = %error, "Plugin cannot be used");
            count += 1;
        }
    }
    count
}

/// Render an error for the terminal.
pub fn format_error(err: &KnError) -> String {
    match err.category() {
        ErrorCategory::UserInput => {
            format!("Error: {}\nRun '{} --help' for usage.", err, ROOT_VERB)
        }
        ErrorCategory::PluginFailure => err.to_string(),
        _ => format!("Error: {}", err),
    }
}
