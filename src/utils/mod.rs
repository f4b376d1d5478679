//! Shared helpers.

pub mod signal;
