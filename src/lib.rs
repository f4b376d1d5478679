//! kn - Knative command line client with an extensible plugin system
//!
//! The binary is a thin wrapper around [`Root`]; everything else is exposed
//! so plugins can be registered in-process and tests can drive a full
//! invocation.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod plugins;
pub mod root;
pub mod utils;

pub use config::Config;
pub use error::{KnError, Result};
pub use root::{format_error, Root};
