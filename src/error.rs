//! Error types for kn
//!
//! This module defines the error taxonomy shared by the configuration store,
//! the command tree, the plugin subsystem and the root command. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Every error maps to an [`ErrorCategory`], which the root command uses to
//! decide how the message is presented (help banner or not).

use std::path::PathBuf;

use thiserror::Error;

/// How an error is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input: unknown command, bad flag, unknown alias. Gets a help banner.
    UserInput,
    /// A plugin failed. Printed verbatim.
    PluginFailure,
    /// Config file could not be read, parsed or written.
    Config,
    /// Plugin catalog problems (built-in overwrite, malformed names).
    PluginCatalog,
    /// Programming errors and unexpected I/O.
    Internal,
}

/// The primary error type for kn operations.
#[derive(Error, Debug)]
pub enum KnError {
    /// Generic invalid user input (missing argument, invalid flag value, ...)
    #[error("{0}")]
    UserInput(String),

    /// A token did not match any child of a command group
    #[error("unknown sub-command '{token}' for '{parent}'. Available sub-commands: {}", children.join(", "))]
    UnknownSubCommand {
        token: String,
        parent: String,
        children: Vec<String>,
    },

    /// A command group was invoked without a child verb
    #[error("no sub-command given for '{parent}'. Available sub-commands: {}", children.join(", "))]
    NoSubCommand {
        parent: String,
        children: Vec<String>,
    },

    /// Both `--X` and `--no-X` were given
    #[error("only one of '--{flag}' and '--no-{flag}' may be specified")]
    FlagConflict { flag: String },

    /// An in-process plugin returned an error or an external plugin failed
    #[error("{0}")]
    PluginFailure(String),

    /// The config file could not be read or parsed
    #[error("Configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// `set` was called on a list-valued key
    #[error("configuration key '{0}' holds a list and cannot be set to a scalar")]
    NonScalarKey(String),

    /// The key is not known to the configuration store
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    /// The value does not fit the type of the key
    #[error("invalid value '{value}' for configuration key '{key}'")]
    InvalidValue { key: String, value: String },

    /// A mapping with this alias/prefix already exists
    #[error("mapping '{0}' already exists")]
    AliasExists(String),

    /// No mapping with this alias/prefix exists
    #[error("mapping '{0}' not found")]
    AliasNotFound(String),

    /// Plugin catalog problems
    #[error("Plugin error: {0}")]
    PluginCatalog(String),

    /// Structural violations in the command tree
    #[error("Internal error: {0}")]
    Internal(String),

    /// The invocation was interrupted by a signal
    #[error("operation cancelled")]
    Cancelled,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),
}

impl KnError {
    /// Classify this error for presentation.
    pub fn category(&self) -> ErrorCategory {
        match self {
            KnError::UserInput(_)
            | KnError::UnknownSubCommand { .. }
            | KnError::NoSubCommand { .. }
            | KnError::FlagConflict { .. }
            | KnError::NonScalarKey(_)
            | KnError::UnknownKey(_)
            | KnError::InvalidValue { .. }
            | KnError::AliasExists(_)
            | KnError::AliasNotFound(_) => ErrorCategory::UserInput,
            KnError::PluginFailure(_) | KnError::Cancelled => ErrorCategory::PluginFailure,
            KnError::Config { .. } | KnError::Yaml(_) => ErrorCategory::Config,
            KnError::PluginCatalog(_) => ErrorCategory::PluginCatalog,
            KnError::Internal(_) | KnError::Io(_) | KnError::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Shorthand for a config error tied to a file.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        KnError::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for kn operations.
pub type Result<T> = std::result::Result<T, KnError>;
