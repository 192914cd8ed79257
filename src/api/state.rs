//! Application state for the payroll engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::{ConfigResolver, ConfigurationStore, InMemoryStore};

/// Shared application state.
///
/// Holds the configuration resolver, and through it the store and the
/// resolved-configuration cache, shared by all request handlers.
pub struct AppState<S = InMemoryStore> {
    resolver: Arc<ConfigResolver<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<S: ConfigurationStore> AppState<S> {
    /// Creates a new application state over the given store.
    pub fn new(store: S) -> Self {
        Self::from_resolver(ConfigResolver::new(store))
    }

    /// Creates a new application state around an existing resolver.
    pub fn from_resolver(resolver: ConfigResolver<S>) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Returns a reference to the configuration resolver.
    pub fn resolver(&self) -> &ConfigResolver<S> {
        &self.resolver
    }
}
