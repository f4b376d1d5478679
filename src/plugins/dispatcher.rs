//! Plugin dispatch
//!
//! Finds the plugin a command line refers to and runs it. Matching uses the
//! positional tokens only: for `kn service log --since=1h x` the candidates
//! are `kn-service-log-x`, `kn-service-log` and `kn-service`, longest first.
//! The value of an unknown flag given as a separate token (`--since 1h`)
//! counts as a positional token.
//! A `-` inside a token becomes `_` in the candidate name, so `kn foo-bar`
//! looks for `kn-foo_bar`.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::flags::FlagRegistry;
use crate::cli::rewrite::{split_for_plugin, strip_flags};
use crate::error::{KnError, Result};

use super::catalog::PluginCatalog;
use super::context::ContextManager;
use super::launcher::{LaunchOutcome, LaunchRequest, ProcessLauncher};
use super::types::{name_from_tokens, Location};

/// Environment variable carrying consumed context values to external
/// plugins, as a JSON object.
pub const PLUGIN_CONTEXT_ENV: &str = "KN_PLUGIN_CONTEXT";

/// A plugin selected for a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMatch {
    /// Canonical plugin name.
    pub name: String,
    /// The positional tokens that selected it, as typed.
    pub matched: Vec<String>,
    /// The command line with the matched tokens cut out.
    pub args: Vec<String>,
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No plugin answers to the command line.
    NoMatch,
    /// The plugin ran to completion with this exit code.
    Invoked(i32),
    /// The process image was replaced by the plugin.
    Replaced,
}

/// Runs inlined and external plugins.
pub struct PluginDispatcher {
    launcher: Box<dyn ProcessLauncher>,
    registry: FlagRegistry,
}

impl PluginDispatcher {
    pub fn new(launcher: Box<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            registry: FlagRegistry::bootstrap(),
        }
    }

    pub fn launcher(&self) -> &dyn ProcessLauncher {
        self.launcher.as_ref()
    }

    /// Find the longest active plugin named by the leading positional tokens
    /// of `argv`, using at least `min_parts` tokens.
    pub fn match_plugin(
        catalog: &PluginCatalog,
        argv: &[String],
        registry: &FlagRegistry,
        min_parts: usize,
    ) -> Option<PluginMatch> {
        let positional = strip_flags(argv, registry);
        let min_parts = min_parts.max(1);
        if positional.len() < min_parts {
            return None;
        }

        (min_parts..=positional.len()).rev().find_map(|k| {
            let tokens = &positional[..k];
            let name = name_from_tokens(tokens);
            let descriptor = catalog.find_by_name(&name)?;
            debug!(plugin = %descriptor.name, parts = k, "Matched plugin");
            Some(PluginMatch {
                name: descriptor.name.clone(),
                matched: tokens.to_vec(),
                args: split_for_plugin(argv, tokens),
            })
        })
    }

    /// Match `argv` against the catalog and run the plugin, if any.
    pub async fn dispatch(
        &self,
        catalog: &PluginCatalog,
        argv: &[String],
        context: &mut ContextManager,
        cancel: CancellationToken,
    ) -> Result<DispatchOutcome> {
        match Self::match_plugin(catalog, argv, &self.registry, 1) {
            Some(m) => self.invoke(catalog, &m, context, cancel).await,
            None => Ok(DispatchOutcome::NoMatch),
        }
    }

    /// Run an already matched plugin.
    ///
    /// Inlined plugins run in-process; context-aware ones receive the values
    /// of the keys they consume. External plugins get the same values in
    /// [`PLUGIN_CONTEXT_ENV`]. Any failure, including a non-zero exit code,
    /// is a `PluginFailure`.
    pub async fn invoke(
        &self,
        catalog: &PluginCatalog,
        found: &PluginMatch,
        context: &mut ContextManager,
        cancel: CancellationToken,
    ) -> Result<DispatchOutcome> {
        let descriptor = catalog
            .find_by_name(&found.name)
            .ok_or_else(|| KnError::Internal(format!("plugin '{}' vanished", found.name)))?
            .clone();
        let consumed = context.consumed_by(catalog, &descriptor).await;

        match &descriptor.location {
            Location::Inlined => {
                let plugin = catalog.inlined(&descriptor.name).ok_or_else(|| {
                    KnError::Internal(format!("inlined plugin '{}' has no handle", descriptor.name))
                })?;
                info!(plugin = %descriptor.name, "Running inlined plugin");
                let result = match plugin.as_context_aware() {
                    Some(aware) => {
                        aware
                            .execute_with_context(cancel, &consumed, &found.args)
                            .await
                    }
                    None => plugin.execute(cancel, &found.args).await,
                };
                result.map_err(|e| KnError::PluginFailure(format!("{:#}", e)))?;
                Ok(DispatchOutcome::Invoked(0))
            }
            Location::PluginDir(path) | Location::SearchPath(path) => {
                let mut env = Vec::new();
                if !consumed.is_empty() {
                    env.push((
                        PLUGIN_CONTEXT_ENV.to_string(),
                        serde_json::to_string(&consumed)?,
                    ));
                }
                let request = LaunchRequest {
                    program: path.clone(),
                    args: found.args.clone(),
                    env,
                };

                if self.launcher.replaces_process() {
                    // nothing runs after a successful exec
                    context.write_cache();
                }

                info!(plugin = %descriptor.name, path = %path.display(), "Running external plugin");
                match self.launcher.launch(&request, cancel).await? {
                    LaunchOutcome::Replaced => Ok(DispatchOutcome::Replaced),
                    LaunchOutcome::Exited(0) => Ok(DispatchOutcome::Invoked(0)),
                    LaunchOutcome::Exited(code) => Err(KnError::PluginFailure(format!(
                        "plugin '{}' exited with code {}",
                        descriptor.name, code
                    ))),
                }
            }
        }
    }
}

impl fmt::Debug for PluginDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDispatcher")
            .field("replaces_process", &self.launcher.replaces_process())
            .finish()
    }
}
