//! Bootstrap flags.
//!
//! These flags are recognized before the command tree is walked, because
//! their values decide how the tree and the plugin catalog are built. They
//! may appear anywhere on the command line.

use std::path::PathBuf;

use crate::error::{KnError, Result};

/// Description of a flag known to the preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    /// Long name without dashes.
    pub name: &'static str,
    /// Optional single-character alias.
    pub short: Option<char>,
    /// Whether the flag consumes the following token as its value.
    pub takes_value: bool,
    /// Whether `--no-<name>` is accepted.
    pub negatable: bool,
}

/// The flags every invocation understands.
pub const BOOTSTRAP_FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: "config",
        short: None,
        takes_value: true,
        negatable: false,
    },
    FlagSpec {
        name: "plugins-dir",
        short: None,
        takes_value: true,
        negatable: false,
    },
    FlagSpec {
        name: "lookup-plugins",
        short: None,
        takes_value: false,
        negatable: true,
    },
    FlagSpec {
        name: "log-http",
        short: None,
        takes_value: false,
        negatable: false,
    },
    FlagSpec {
        name: "kubeconfig",
        short: None,
        takes_value: true,
        negatable: false,
    },
    FlagSpec {
        name: "help",
        short: Some('h'),
        takes_value: false,
        negatable: false,
    },
];

/// A set of flag specs with lookup by command-line token.
#[derive(Debug, Clone)]
pub struct FlagRegistry {
    specs: Vec<FlagSpec>,
}

impl FlagRegistry {
    /// Registry of the bootstrap flags.
    pub fn bootstrap() -> Self {
        Self::new(BOOTSTRAP_FLAGS.to_vec())
    }

    pub fn new(specs: Vec<FlagSpec>) -> Self {
        Self { specs }
    }

    /// Look up the spec for a token such as `--config`, `--config=x`,
    /// `--no-lookup-plugins` or `-h`. The second value tells whether the
    /// token used the negated form.
    pub fn lookup(&self, token: &str) -> Option<(&FlagSpec, bool)> {
        if let Some(long) = token.strip_prefix("--") {
            let name = long.split_once('=').map_or(long, |(n, _)| n);
            if let Some(spec) = self.specs.iter().find(|s| s.name == name) {
                return Some((spec, false));
            }
            let negated = name.strip_prefix("no-")?;
            return self
                .specs
                .iter()
                .find(|s| s.negatable && s.name == negated)
                .map(|s| (s, true));
        }
        let short = token.strip_prefix('-')?;
        let mut chars = short.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        self.specs
            .iter()
            .find(|s| s.short == Some(c))
            .map(|s| (s, false))
    }

    /// Whether `token` is a known flag that consumes the next token.
    ///
    /// `--flag=value` carries its value inline and does not.
    pub fn takes_separate_value(&self, token: &str) -> bool {
        match self.lookup(token) {
            Some((spec, negated)) => spec.takes_value && !negated && !token.contains('='),
            None => false,
        }
    }
}

impl Default for FlagRegistry {
    fn default() -> Self {
        Self::bootstrap()
    }
}

/// Values of the bootstrap flags for this invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapFlags {
    /// `--config <path>`
    pub config: Option<PathBuf>,
    /// `--plugins-dir <path>`
    pub plugins_dir: Option<String>,
    /// `--lookup-plugins` / `--no-lookup-plugins`
    pub lookup_plugins: Option<bool>,
    /// `--log-http`
    pub log_http: bool,
    /// `--kubeconfig <path>`
    pub kubeconfig: Option<PathBuf>,
    /// `--help` / `-h`
    pub help: bool,
}

impl BootstrapFlags {
    /// Scan the whole argument vector for bootstrap flags.
    ///
    /// Fails when a value-taking flag has no value or when a negatable flag
    /// is given in both forms.
    pub fn parse(argv: &[String]) -> Result<Self> {
        let registry = FlagRegistry::bootstrap();
        let mut flags = BootstrapFlags::default();
        let mut saw_positive = false;
        let mut saw_negative = false;

        let mut iter = argv.iter().peekable();
        while let Some(token) = iter.next() {
            let Some((spec, negated)) = registry.lookup(token) else {
                continue;
            };

            let value = if spec.takes_value {
                match token.split_once('=') {
                    Some((_, v)) => Some(v.to_string()),
                    None => match iter.next() {
                        Some(v) => Some(v.clone()),
                        None => {
                            return Err(KnError::UserInput(format!(
                                "flag '--{}' needs a value",
                                spec.name
                            )))
                        }
                    },
                }
            } else {
                None
            };

            match spec.name {
                "config" => flags.config = value.map(PathBuf::from),
                "plugins-dir" => flags.plugins_dir = value,
                "kubeconfig" => flags.kubeconfig = value.map(PathBuf::from),
                "log-http" => flags.log_http = true,
                "help" => flags.help = true,
                "lookup-plugins" => {
                    if negated {
                        saw_negative = true;
                    } else {
                        saw_positive = true;
                    }
                    flags.lookup_plugins = Some(!negated);
                }
                _ => {}
            }
        }

        if saw_positive && saw_negative {
            return Err(KnError::FlagConflict {
                flag: "lookup-plugins".to_string(),
            });
        }

        Ok(flags)
    }
}

/// Remove bootstrap flags (and their values) from `argv`, keeping
/// everything else in order. This is what a built-in leaf's parser sees.
pub fn remove_bootstrap_flags(argv: &[String], registry: &FlagRegistry) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len());
    let mut iter = argv.iter();
    while let Some(token) = iter.next() {
        match registry.lookup(token) {
            // help is left for the leaf parser to render
            Some((spec, _)) if spec.name == "help" => out.push(token.clone()),
            Some(_) => {
                if registry.takes_separate_value(token) {
                    iter.next();
                }
            }
            None => out.push(token.clone()),
        }
    }
    out
}
