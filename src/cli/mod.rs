//! Command-line preprocessing: bootstrap flags and argument rewriting.

pub mod flags;
pub mod rewrite;

pub use flags::{BootstrapFlags, FlagRegistry, FlagSpec};
pub use rewrite::{check_boolean_pairs, split_for_plugin, ArgumentRewriter, Invocation};
