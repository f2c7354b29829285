//! Plugin registry: the set of available plugins, keyed by name.
//!
//! The registry is an explicit value built at startup and passed to the
//! extractor. Registration validates the plugin's declaration so nothing
//! malformed ever reaches the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::SqlitePlugin;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("plugin '{name}' is already registered")]
    DuplicateIdentity { name: String },

    #[error("plugin '{name}' has an invalid declaration: {reason}")]
    InvalidDeclaration { name: String, reason: String },

    #[error("no plugin named '{name}'")]
    NotFound { name: String },
}

impl From<RegistryError> for sift_common::Error {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateIdentity { name } => {
                sift_common::Error::DuplicateIdentity { name }
            }
            RegistryError::InvalidDeclaration { name, reason } => {
                sift_common::Error::InvalidPluginDeclaration { name, reason }
            }
            RegistryError::NotFound { name } => sift_common::Error::PluginNotFound { name },
        }
    }
}

/// Registered plugins in registration order.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn SqlitePlugin>>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every plugin shipped with this crate.
    pub fn with_builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for plugin in crate::plugins::builtin() {
            registry.register(plugin)?;
        }
        Ok(registry)
    }

    /// Add a plugin. Fails if the name is taken or the declaration is
    /// malformed; the registry is unchanged on failure.
    pub fn register(&mut self, plugin: Arc<dyn SqlitePlugin>) -> Result<(), RegistryError> {
        let descriptor = plugin.descriptor();
        let name = descriptor.name.clone();

        descriptor
            .validate(|handler| plugin.handles(handler))
            .map_err(|reason| RegistryError::InvalidDeclaration {
                name: name.clone(),
                reason,
            })?;

        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateIdentity { name });
        }

        debug!(plugin = %name, queries = descriptor.queries.len(), "plugin registered");
        self.index.insert(name, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn SqlitePlugin>, RegistryError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.plugins[i]))
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn SqlitePlugin>> {
        self.plugins.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Row;
    use crate::plugin::{Mediator, PluginDescriptor, RowError, RowHandler};

    struct Stub {
        descriptor: PluginDescriptor,
    }

    impl Stub {
        fn named(name: &str, handler: &str) -> Arc<dyn SqlitePlugin> {
            Arc::new(Self {
                descriptor: PluginDescriptor::new(name, "stub")
                    .require("t", ["a"])
                    .query("SELECT a FROM t", handler),
            })
        }
    }

    impl RowHandler for Stub {
        fn handles(&self, handler: &str) -> bool {
            handler == "ParseRow"
        }

        fn handle_row(
            &self,
            _handler: &str,
            _query: &str,
            _row: &Row,
            _mediator: &Mediator<'_>,
        ) -> Result<(), RowError> {
            Ok(())
        }
    }

    impl SqlitePlugin for Stub {
        fn descriptor(&self) -> &PluginDescriptor {
            &self.descriptor
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = PluginRegistry::new();
        registry.register(Stub::named("alpha", "ParseRow")).unwrap();
        registry.register(Stub::named("beta", "ParseRow")).unwrap();

        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert_eq!(registry.lookup("beta").unwrap().name(), "beta");
        assert!(registry.contains("alpha"));
    }

    #[test]
    fn test_duplicate_rejected_and_registry_unchanged() {
        let mut registry = PluginRegistry::new();
        registry.register(Stub::named("alpha", "ParseRow")).unwrap();
        let err = registry.register(Stub::named("alpha", "ParseRow")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateIdentity {
                name: "alpha".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_handler_rejected() {
        let mut registry = PluginRegistry::new();
        let err = registry.register(Stub::named("alpha", "Missing")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDeclaration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_repeated_query_rejected() {
        let repeated = Arc::new(Stub {
            descriptor: PluginDescriptor::new("alpha", "stub")
                .require("t", ["a"])
                .query("SELECT a FROM t", "ParseRow")
                .query("SELECT a FROM t", "ParseRow"),
        });
        let mut registry = PluginRegistry::new();
        let err = registry.register(repeated).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDeclaration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_missing() {
        let registry = PluginRegistry::new();
        let err = registry.lookup("nope").err().unwrap();
        assert_eq!(err, RegistryError::NotFound { name: "nope".into() });
    }

    #[test]
    fn test_builtin_registry() {
        let registry = PluginRegistry::with_builtin().unwrap();
        assert!(registry.contains("google_callscreen"));
        assert!(registry.contains("android_webview"));
        assert!(registry.contains("twitter_android"));
    }

    #[test]
    fn test_error_codes() {
        let err: sift_common::Error = RegistryError::NotFound { name: "x".into() }.into();
        assert!(matches!(err, sift_common::Error::PluginNotFound { .. }));
    }
}
