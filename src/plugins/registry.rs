//! Registry of in-process plugins
//!
//! Inlined plugins are compiled into the binary and registered before the
//! catalog is built. The registry keeps them in registration order and
//! rejects a second plugin with the same name.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use kn::plugins::{InlinedRegistry, Plugin};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Plugin for Hello {
//!     fn name(&self) -> &str {
//!         "kn-hello"
//!     }
//!
//!     async fn execute(&self, _cancel: CancellationToken, _args: &[String]) -> anyhow::Result<()> {
//!         println!("hello");
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = InlinedRegistry::new();
//! registry.register(Arc::new(Hello)).unwrap();
//! assert_eq!(registry.len(), 1);
//! assert!(registry.get("kn-hello").is_some());
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::error::{KnError, Result};

use super::types::Plugin;

/// In-process plugins in registration order.
#[derive(Clone, Default)]
pub struct InlinedRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl InlinedRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin.
    ///
    /// Fails with `PluginCatalog` if a plugin with the same name is already
    /// registered; the registry is unchanged in that case.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        if self.get(plugin.name()).is_some() {
            return Err(KnError::PluginCatalog(format!(
                "inlined plugin '{}' is registered twice",
                plugin.name()
            )));
        }
        debug!(plugin = %plugin.name(), "Registered inlined plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// All plugins, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for InlinedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}
