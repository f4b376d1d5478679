//! Plugin subsystem for kn
//!
//! Plugins add commands without touching the binary. An external plugin is
//! any executable named `kn-<part>(-<part>)*`, found in the plugin directory
//! or (optionally) on `PATH`; `kn source kafka create` runs
//! `kn-source-kafka create`. Inlined plugins implement [`Plugin`] and are
//! registered in-process before the catalog is built.
//!
//! # Architecture
//!
//! - **types**: descriptors, manifests and the in-process capability traits
//! - **registry**: inlined plugins in registration order
//! - **classifier**: platform-specific executable detection
//! - **catalog**: discovery, deduplication and lookup
//! - **verifier**: checks reported by `kn plugin list --verbose`
//! - **context**: manifest cache and context sharing between plugins
//! - **launcher**: exec / spawn of external binaries
//! - **dispatcher**: matching a command line to a plugin and running it
//!
//! # Plugin Directory Structure
//!
//! ```text
//! ~/.config/kn/
//! ├── config.yaml
//! ├── context.json
//! └── plugins/
//!     ├── kn-admin
//!     ├── kn-service-log
//!     └── kn-source-kafka
//! ```
//!
//! # Manifest protocol
//!
//! Invoked with the single argument `manifest`, a plugin taking part in
//! context sharing prints:
//!
//! ```json
//! { "hasManifest": true, "producesKeys": ["service"], "consumesKeys": [] }
//! ```
//!
//! Consumed values reach external plugins as a JSON object in
//! `KN_PLUGIN_CONTEXT`.

pub mod catalog;
pub mod classifier;
pub mod context;
pub mod dispatcher;
pub mod launcher;
pub mod registry;
pub mod types;
pub mod verifier;

pub use catalog::PluginCatalog;
pub use classifier::{platform_classifier, Executability, FileClassifier};
pub use context::ContextManager;
pub use dispatcher::{DispatchOutcome, PluginDispatcher, PluginMatch, PLUGIN_CONTEXT_ENV};
pub use launcher::{platform_launcher, LaunchOutcome, LaunchRequest, ProcessLauncher};
pub use registry::InlinedRegistry;
pub use types::{ContextAwarePlugin, ContextData, Location, Manifest, Plugin, PluginDescriptor};
pub use verifier::{PluginVerifier, Verification};
