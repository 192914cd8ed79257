//! Hierarchical configuration resolution.
//!
//! This module provides the [`ConfigResolver`] type, which fetches the
//! global, sector and organization layers from a [`ConfigurationStore`],
//! merges them with precedence organization > sector > global, and caches
//! the result per organization slug.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ConfigLayer, EngineError, EngineResult};

use super::cache::{ConfigCache, InMemoryConfigCache};
use super::mapper::project;
use super::merge::{deep_merge, fold_records};
use super::store::{ConfigRecord, ConfigurationStore, OrganizationRecord, StoreError};
use super::types::NormalizedRules;

/// Identity fields of the organization a configuration was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationIdentity {
    /// The unique slug of the organization.
    pub slug: String,
    /// The display name of the organization.
    pub name: String,
    /// The sector the organization inherits rules from.
    pub sector: Option<String>,
}

/// The merged configuration of one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// The organization this configuration belongs to.
    pub organization: OrganizationIdentity,
    /// The merged rule values, an object keyed by rule name.
    pub values: Value,
}

impl EffectiveConfig {
    /// Merges the three layers into one configuration.
    ///
    /// Inactive records are ignored. Within a layer, records are folded in
    /// the order given, so duplicate active keys resolve to the last one.
    pub fn merge_layers(
        organization: OrganizationRecord,
        global: Vec<ConfigRecord>,
        sector: Vec<ConfigRecord>,
    ) -> EngineResult<Self> {
        let mut accumulator = Map::new();

        for (layer, records) in [(ConfigLayer::Global, global), (ConfigLayer::Sector, sector)] {
            let active: Vec<ConfigRecord> = records.into_iter().filter(ConfigRecord::is_active).collect();
            for key in fold_records(&mut accumulator, active) {
                warn!(
                    org_slug = %organization.slug,
                    layer = %layer,
                    key = %key,
                    "Multiple active records for one key; the last fetched record wins"
                );
            }
        }

        let mut values = Value::Object(accumulator);
        match organization.configuration {
            Value::Null => {}
            overrides @ Value::Object(_) => deep_merge(&mut values, overrides),
            other => {
                return Err(EngineError::invalid_rule(
                    format!("organizations.{}.configuration", organization.slug),
                    format!("expected an object, found {}", json_kind(&other)),
                ));
            }
        }

        Ok(Self {
            organization: OrganizationIdentity {
                slug: organization.slug,
                name: organization.name,
                sector: organization.sector,
            },
            values,
        })
    }

    /// Returns the merged value of one rule.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn fetch_failed(layer: ConfigLayer, error: StoreError) -> EngineError {
    EngineError::ConfigFetchFailed {
        layer,
        message: error.to_string(),
    }
}

/// Resolves and caches effective configurations.
///
/// Resolution is a pure read, so concurrent requests for the same uncached
/// slug may each fetch from the store; they produce equal results.
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::{ConfigResolver, InMemoryStore};
///
/// # async fn run() -> payroll_engine::error::EngineResult<()> {
/// let store = InMemoryStore::load("./config/store.yaml").expect("store");
/// let resolver = ConfigResolver::new(store);
///
/// let config = resolver.resolve("trf-demo").await?;
/// println!("Resolved {}", config.organization.name);
///
/// resolver.invalidate("trf-demo");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigResolver<S, C = InMemoryConfigCache> {
    store: S,
    cache: C,
}

impl<S: ConfigurationStore> ConfigResolver<S> {
    /// Creates a resolver with a process-lifetime in-memory cache.
    pub fn new(store: S) -> Self {
        Self::with_cache(store, InMemoryConfigCache::new())
    }
}

impl<S: ConfigurationStore, C: ConfigCache> ConfigResolver<S, C> {
    /// Creates a resolver with an injected cache.
    pub fn with_cache(store: S, cache: C) -> Self {
        Self { store, cache }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolves the effective configuration of an organization.
    ///
    /// # Errors
    ///
    /// - `ConfigNotFound` if no organization row matches `org_slug`
    /// - `ConfigFetchFailed` if any layer fetch fails
    /// - `InvalidRule` if the organization's inline configuration is not an object
    pub async fn resolve(&self, org_slug: &str) -> EngineResult<Arc<EffectiveConfig>> {
        if let Some(cached) = self.cache.get(org_slug) {
            debug!(org_slug = %org_slug, "Configuration cache hit");
            return Ok(cached);
        }
        debug!(org_slug = %org_slug, "Configuration cache miss");

        let effective = Arc::new(self.fetch(org_slug).await?);
        self.cache.insert(org_slug, Arc::clone(&effective));

        info!(
            org_slug = %org_slug,
            sector = effective.organization.sector.as_deref().unwrap_or("-"),
            rules = effective.values.as_object().map_or(0, Map::len),
            "Resolved effective configuration"
        );
        Ok(effective)
    }

    /// Resolves an organization and projects it into normalized rules.
    pub async fn resolve_rules(&self, org_slug: &str) -> EngineResult<NormalizedRules> {
        let effective = self.resolve(org_slug).await?;
        project(&effective)
    }

    /// Drops the cached configuration of one organization.
    pub fn invalidate(&self, org_slug: &str) -> bool {
        let removed = self.cache.invalidate(org_slug);
        debug!(org_slug = %org_slug, removed, "Invalidated cached configuration");
        removed
    }

    /// Drops every cached configuration.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        debug!("Invalidated all cached configurations");
    }

    async fn fetch(&self, org_slug: &str) -> EngineResult<EffectiveConfig> {
        let organization = self
            .store
            .organization(org_slug)
            .await
            .map_err(|e| fetch_failed(ConfigLayer::Organization, e))?
            .ok_or_else(|| EngineError::ConfigNotFound {
                org_slug: org_slug.to_string(),
            })?;

        let sector_records = async {
            match organization.sector.as_deref() {
                Some(sector) => self.store.sector_records(sector).await,
                None => Ok(Vec::new()),
            }
        };
        let (global, sector) = tokio::join!(self.store.global_records(), sector_records);

        let global = global.map_err(|e| fetch_failed(ConfigLayer::Global, e))?;
        let sector = sector.map_err(|e| fetch_failed(ConfigLayer::Sector, e))?;

        EffectiveConfig::merge_layers(organization, global, sector)
    }
}
