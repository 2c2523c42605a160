//! The catalog of installed plugins.
//!
//! A catalog holds one [`InstalledPlugin`] record per `(name, target)`.
//! The manager only ever reads the full snapshot and requests single-record
//! writes, so implementations are free to pick their own storage.

mod file;

pub use file::{CATALOG_FILE_NAME, FileCatalog};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::PluginResult;
use crate::plugin::{InstalledPlugin, Target};

/// Persistent store of installed-plugin records.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every installed record.
    async fn installed(&self) -> PluginResult<Vec<InstalledPlugin>>;

    /// Insert a record, replacing any record with the same `(name, target)`.
    async fn upsert(&self, record: InstalledPlugin) -> PluginResult<()>;

    /// Remove the record with the given identity.
    ///
    /// Returns `true` if a record was removed.
    async fn remove(&self, name: &str, target: Target) -> PluginResult<bool>;
}

/// Replace-or-append on a record list. Shared by the catalog implementations.
pub(crate) fn upsert_record(records: &mut Vec<InstalledPlugin>, record: InstalledPlugin) {
    if let Some(existing) = records
        .iter_mut()
        .find(|r| r.is(&record.name, record.target))
    {
        *existing = record;
    } else {
        records.push(record);
    }
}

/// Remove a record by identity. Shared by the catalog implementations.
pub(crate) fn remove_record(records: &mut Vec<InstalledPlugin>, name: &str, target: Target) -> bool {
    let before = records.len();
    records.retain(|r| !r.is(name, target));
    records.len() < before
}

/// In-memory catalog, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: RwLock<Vec<InstalledPlugin>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with records.
    #[must_use]
    pub fn with_records(records: Vec<InstalledPlugin>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn installed(&self) -> PluginResult<Vec<InstalledPlugin>> {
        Ok(self.records.read().await.clone())
    }

    async fn upsert(&self, record: InstalledPlugin) -> PluginResult<()> {
        upsert_record(&mut *self.records.write().await, record);
        Ok(())
    }

    async fn remove(&self, name: &str, target: Target) -> PluginResult<bool> {
        Ok(remove_record(&mut *self.records.write().await, name, target))
    }
}
