//! The configuration store boundary.
//!
//! The store is an external key-value-with-validity-window service. This
//! module defines its record types, the [`ConfigurationStore`] trait the
//! resolver depends on, and [`InMemoryStore`], a reference implementation
//! that can be loaded from a YAML document.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// One versioned rule record of the global or sector layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// The rule name; becomes a top-level key of the effective configuration.
    pub key: String,
    /// The rule value, an arbitrary nested structure.
    pub value: Value,
    /// First day the record applies.
    pub valid_from: NaiveDate,
    /// Last day the record applies; `None` while the record is active.
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
}

impl ConfigRecord {
    /// Creates an active record valid from the given date.
    pub fn active(key: impl Into<String>, value: Value, valid_from: NaiveDate) -> Self {
        Self {
            key: key.into(),
            value,
            valid_from,
            valid_to: None,
        }
    }

    /// Returns true if the record is open (has no end date).
    pub fn is_active(&self) -> bool {
        self.valid_to.is_none()
    }
}

/// The organization row: identity, sector reference and inline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    /// The unique slug of the organization.
    pub slug: String,
    /// The display name of the organization.
    pub name: String,
    /// The sector whose rules the organization inherits.
    #[serde(default)]
    pub sector: Option<String>,
    /// The organization's own rule overrides, keyed by rule name.
    #[serde(default = "empty_object")]
    pub configuration: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Errors raised by a configuration store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or failed to answer.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A store document could not be read or parsed.
    #[error("failed to parse store document '{path}': {message}")]
    Parse {
        /// The path of the document.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

/// Read-only access to the three configuration layers.
///
/// `global_records` and `sector_records` return the active rows
/// (`valid_to` is `None`). `organization` returns `None` when no row
/// matches the slug.
pub trait ConfigurationStore: Send + Sync {
    /// Fetches the active global records.
    fn global_records(&self) -> impl Future<Output = Result<Vec<ConfigRecord>, StoreError>> + Send;

    /// Fetches the active records of one sector.
    fn sector_records(
        &self,
        sector: &str,
    ) -> impl Future<Output = Result<Vec<ConfigRecord>, StoreError>> + Send;

    /// Fetches the organization row for a slug.
    fn organization(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<OrganizationRecord>, StoreError>> + Send;
}

impl<S: ConfigurationStore> ConfigurationStore for Arc<S> {
    fn global_records(&self) -> impl Future<Output = Result<Vec<ConfigRecord>, StoreError>> + Send {
        (**self).global_records()
    }

    fn sector_records(
        &self,
        sector: &str,
    ) -> impl Future<Output = Result<Vec<ConfigRecord>, StoreError>> + Send {
        (**self).sector_records(sector)
    }

    fn organization(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<OrganizationRecord>, StoreError>> + Send {
        (**self).organization(slug)
    }
}

/// The on-disk layout of a store document.
///
/// ```text
/// global:
///   - key: pension
///     value: { ... }
///     valid_from: 2024-01-01
/// sectors:
///   judiciary:
///     - key: salary_tables
///       value: { ... }
///       valid_from: 2024-01-01
/// organizations:
///   - slug: trf-demo
///     name: Demo Regional Court
///     sector: judiciary
///     configuration: { ... }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Global layer records.
    #[serde(default)]
    pub global: Vec<ConfigRecord>,
    /// Sector layer records by sector name.
    #[serde(default)]
    pub sectors: HashMap<String, Vec<ConfigRecord>>,
    /// Organization rows.
    #[serde(default)]
    pub organizations: Vec<OrganizationRecord>,
}

/// A configuration store held in memory.
///
/// Records can be added while the store is shared, which lets tests
/// observe cache staleness in the resolver.
///
/// # Example
///
/// ```
/// use payroll_engine::config::{ConfigRecord, InMemoryStore, OrganizationRecord};
/// use chrono::NaiveDate;
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// store.put_global(ConfigRecord::active(
///     "constants",
///     json!({"month_day_divisor": 30}),
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
/// ));
/// store.put_organization(OrganizationRecord {
///     slug: "trf-demo".to_string(),
///     name: "Demo Regional Court".to_string(),
///     sector: None,
///     configuration: json!({}),
/// });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: RwLock<StoreDocument>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from a parsed document.
    pub fn from_document(document: StoreDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Parses a store from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StoreError> {
        let document = serde_yaml::from_str::<StoreDocument>(yaml).map_err(|e| StoreError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_document(document))
    }

    /// Loads a store from a YAML file.
    ///
    /// ```no_run
    /// use payroll_engine::config::InMemoryStore;
    ///
    /// let store = InMemoryStore::load("./config/store.yaml")?;
    /// # Ok::<(), payroll_engine::config::StoreError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|e| StoreError::Parse {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

        let document = serde_yaml::from_str::<StoreDocument>(&content).map_err(|e| {
            StoreError::Parse {
                path: path_str,
                message: e.to_string(),
            }
        })?;

        Ok(Self::from_document(document))
    }

    /// Appends a global record.
    pub fn put_global(&self, record: ConfigRecord) {
        self.write().global.push(record);
    }

    /// Appends a record to a sector.
    pub fn put_sector(&self, sector: impl Into<String>, record: ConfigRecord) {
        self.write().sectors.entry(sector.into()).or_default().push(record);
    }

    /// Inserts or replaces an organization row.
    pub fn put_organization(&self, organization: OrganizationRecord) {
        let mut document = self.write();
        document.organizations.retain(|o| o.slug != organization.slug);
        document.organizations.push(organization);
    }

    /// Every write replaces whole records, so a document behind a poisoned
    /// lock is still consistent.
    fn write(&self) -> RwLockWriteGuard<'_, StoreDocument> {
        self.document.write().unwrap_or_else(|poisoned| {
            warn!("Recovered configuration store from a poisoned lock");
            poisoned.into_inner()
        })
    }

    fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> Result<T, StoreError> {
        let document = self.document.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&document))
    }
}

fn active_only(records: &[ConfigRecord]) -> Vec<ConfigRecord> {
    records.iter().filter(|r| r.is_active()).cloned().collect()
}

impl ConfigurationStore for InMemoryStore {
    async fn global_records(&self) -> Result<Vec<ConfigRecord>, StoreError> {
        self.read(|document| active_only(&document.global))
    }

    async fn sector_records(&self, sector: &str) -> Result<Vec<ConfigRecord>, StoreError> {
        self.read(|document| {
            document
                .sectors
                .get(sector)
                .map(|records| active_only(records))
                .unwrap_or_default()
        })
    }

    async fn organization(&self, slug: &str) -> Result<Option<OrganizationRecord>, StoreError> {
        self.read(|document| {
            document
                .organizations
                .iter()
                .find(|o| o.slug == slug)
                .cloned()
        })
    }
}
