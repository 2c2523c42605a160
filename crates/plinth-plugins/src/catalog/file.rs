//! TOML file catalog.
//!
//! The document carries `schema_version = 1` and a flat `[[plugin]]` array of
//! [`InstalledPlugin`] records. Readers take a shared advisory lock and
//! writers an exclusive one, both on a `.lk` sibling file, so concurrent
//! `plinth` processes never interleave a read-modify-write.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Catalog, remove_record, upsert_record};
use crate::error::{PluginError, PluginResult};
use crate::plugin::{InstalledPlugin, Target};

/// Current catalog schema version.
const SCHEMA_VERSION: u32 = 1;

/// Standard catalog file name.
pub const CATALOG_FILE_NAME: &str = "catalog.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
    schema_version: u32,
    #[serde(default, rename = "plugin")]
    entries: Vec<InstalledPlugin>,
}

impl Default for CatalogDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: Vec::new(),
        }
    }
}

/// Catalog persisted as a TOML document.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    /// Use the catalog at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the catalog document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run_blocking<T, F>(&self, f: F) -> PluginResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> PluginResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        let shown = self.path.clone();
        tokio::task::spawn_blocking(move || f(&path))
            .await
            .map_err(|e| catalog_err(&shown, format!("catalog task failed: {e}")))?
    }
}

#[async_trait]
impl Catalog for FileCatalog {
    async fn installed(&self) -> PluginResult<Vec<InstalledPlugin>> {
        self.run_blocking(|path| load_or_default(path).map(|doc| doc.entries))
            .await
    }

    async fn upsert(&self, record: InstalledPlugin) -> PluginResult<()> {
        self.run_blocking(move |path| {
            update(path, |doc| {
                upsert_record(&mut doc.entries, record);
                Ok(())
            })
        })
        .await
    }

    async fn remove(&self, name: &str, target: Target) -> PluginResult<bool> {
        let name = name.to_string();
        self.run_blocking(move |path| {
            let mut removed = false;
            update(path, |doc| {
                removed = remove_record(&mut doc.entries, &name, target);
                Ok(())
            })?;
            Ok(removed)
        })
        .await
    }
}

fn load_or_default(path: &Path) -> PluginResult<CatalogDocument> {
    let _lock_guard = acquire_lock_file(path, LockMode::Shared)?;

    match std::fs::read_to_string(path) {
        Ok(content) => parse_content(path, &content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CatalogDocument::default()),
        Err(e) => Err(catalog_err(path, format!("failed to read catalog: {e}"))),
    }
}

fn parse_content(path: &Path, content: &str) -> PluginResult<CatalogDocument> {
    let doc: CatalogDocument = toml::from_str(content)
        .map_err(|e| catalog_err(path, format!("failed to parse catalog: {e}")))?;

    if doc.schema_version != SCHEMA_VERSION {
        warn!(
            path = %path.display(),
            found = doc.schema_version,
            expected = SCHEMA_VERSION,
            "Catalog schema version mismatch, attempting best-effort load"
        );
    }

    debug!(path = %path.display(), entries = doc.entries.len(), "Loaded plugin catalog");
    Ok(doc)
}

/// Load, mutate and save under a single exclusive lock.
fn update<F>(path: &Path, f: F) -> PluginResult<()>
where
    F: FnOnce(&mut CatalogDocument) -> PluginResult<()>,
{
    let _lock_guard = acquire_lock_file(path, LockMode::Exclusive)?;

    let mut doc = match std::fs::read_to_string(path) {
        Ok(content) => parse_content(path, &content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogDocument::default(),
        Err(e) => return Err(catalog_err(path, format!("failed to read catalog: {e}"))),
    };

    f(&mut doc)?;

    save_inner(&doc, path)
}

/// Write via a temp file in the same directory and rename into place.
/// The caller holds the exclusive lock.
fn save_inner(doc: &CatalogDocument, path: &Path) -> PluginResult<()> {
    let header = "# Auto-generated by plinth. Do not edit manually.\n\n";
    let body = toml::to_string_pretty(doc)
        .map_err(|e| catalog_err(path, format!("failed to serialize catalog: {e}")))?;

    let content = format!("{header}{body}");

    let parent = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
        catalog_err(path, format!("failed to create temp file for atomic write: {e}"))
    })?;

    tmp.write_all(content.as_bytes())
        .map_err(|e| catalog_err(path, format!("failed to write temp catalog: {e}")))?;

    tmp.as_file()
        .sync_all()
        .map_err(|e| catalog_err(path, format!("failed to sync temp catalog to disk: {e}")))?;

    tmp.persist(path)
        .map_err(|e| catalog_err(path, format!("failed to atomically replace catalog: {e}")))?;

    debug!(path = %path.display(), entries = doc.entries.len(), "Saved plugin catalog");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Acquire an advisory lock on the `.lk` sibling of the catalog.
///
/// Shared locks never create files: without a lock file there has never been
/// a writer to coordinate with.
fn acquire_lock_file(catalog_path: &Path, mode: LockMode) -> PluginResult<Option<std::fs::File>> {
    let lock_path = catalog_path.with_extension("lk");

    match mode {
        LockMode::Shared => match std::fs::OpenOptions::new().read(true).open(&lock_path) {
            Ok(lock_file) => {
                lock_file.lock_shared().map_err(|e| {
                    catalog_err(catalog_path, format!("failed to acquire shared file lock: {e}"))
                })?;
                Ok(Some(lock_file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(catalog_err(
                catalog_path,
                format!("failed to open lock file: {e}"),
            )),
        },
        LockMode::Exclusive => {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    catalog_err(catalog_path, format!("failed to create catalog directory: {e}"))
                })?;
            }

            let lock_file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&lock_path)
                .map_err(|e| catalog_err(catalog_path, format!("failed to open lock file: {e}")))?;

            lock_file.lock_exclusive().map_err(|e| {
                catalog_err(catalog_path, format!("failed to acquire exclusive file lock: {e}"))
            })?;

            Ok(Some(lock_file))
        },
    }
}

fn catalog_err(path: &Path, message: String) -> PluginError {
    PluginError::Catalog {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Scope;

    #[tokio::test]
    async fn missing_file_is_empty_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(tmp.path().join(CATALOG_FILE_NAME));
        assert!(catalog.installed().await.unwrap().is_empty());
        // Reads never create artifacts.
        assert!(!tmp.path().join("catalog.lk").exists());
    }

    #[tokio::test]
    async fn records_survive_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CATALOG_FILE_NAME);
        let catalog = FileCatalog::new(&path);

        let record = InstalledPlugin::new("cluster", Target::Kubernetes, "v1.6.0")
            .with_scope(Scope::Context)
            .with_discovery_source("default")
            .with_group("Run");
        catalog.upsert(record.clone()).await.unwrap();

        let reloaded = FileCatalog::new(&path).installed().await.unwrap();
        assert_eq!(reloaded, vec![record]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Auto-generated by plinth"));
        assert!(content.contains("schema_version = 1"));
        assert!(content.contains("[[plugin]]"));
    }

    #[tokio::test]
    async fn upsert_then_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(tmp.path().join(CATALOG_FILE_NAME));

        catalog
            .upsert(InstalledPlugin::new("login", Target::Unknown, "v0.1.0"))
            .await
            .unwrap();
        catalog
            .upsert(InstalledPlugin::new("login", Target::Unknown, "v0.2.0"))
            .await
            .unwrap();
        let records = catalog.installed().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "v0.2.0");

        assert!(catalog.remove("login", Target::Unknown).await.unwrap());
        assert!(!catalog.remove("login", Target::Unknown).await.unwrap());
        assert!(catalog.installed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_without_target_load_as_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CATALOG_FILE_NAME);
        std::fs::write(
            &path,
            "schema_version = 1\n\n[[plugin]]\nname = \"login\"\nversion = \"v0.2.0\"\n",
        )
        .unwrap();

        let records = FileCatalog::new(&path).installed().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, Target::Unknown);
    }

    #[tokio::test]
    async fn malformed_file_is_catalog_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CATALOG_FILE_NAME);
        std::fs::write(&path, "not [valid toml").unwrap();

        let err = FileCatalog::new(&path).installed().await.unwrap_err();
        assert!(matches!(err, PluginError::Catalog { .. }));
    }
}
