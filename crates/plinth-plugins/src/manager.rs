//! The plugin manager: discovery, install, describe, delete and sync.
//!
//! [`PluginManager`] owns no state of its own beyond configuration. The
//! catalog, transport and inspector are injected, so the same manager drives
//! the CLI (file catalog, HTTP transport, exec inspector) and the tests
//! (in-memory catalog, canned transport).
//!
//! # Install pipeline
//!
//! 1. Resolve the single discovered entry for `(name, target)`.
//! 2. Resolve the version and host-platform artifact, then run the
//!    pre-download trust checks. Any failure here is reported as a
//!    pre-download verification failure.
//! 3. Fetch the bytes through the [`Transport`].
//! 4. Under the install lock: verify the digest, write the binary, inspect
//!    it, validate the record and upsert it into the [`Catalog`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::discovery::{
    DiscoveryFailurePolicy, DiscoveryPlan, discover_all, discover_from_manifest,
    load_descriptor_dir,
};
use crate::error::{PluginError, PluginResult};
use crate::inspect::PluginInspector;
use crate::install_dirs::{plugin_binary_path, remove_plugin_binary, write_plugin_binary};
use crate::platform::Platform;
use crate::plugin::{DiscoveredPlugin, DiscoveryType, InstalledPlugin, PluginStatus, Target};
use crate::resolve::{available_view, dedup, resolve_status};
use crate::transport::Transport;
use crate::trust::{TrustPolicy, sha256_hex, verify_post_download};

/// Plugin name that selects every plugin of a local source.
const INSTALL_ALL: &str = "all";

/// Default number of concurrent installs during a sync.
const DEFAULT_MAX_CONCURRENT_INSTALLS: usize = 4;

/// Static settings of a [`PluginManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory installed binaries are written under.
    pub plugin_root: PathBuf,
    /// Upper bound on concurrent installs during a sync.
    pub max_concurrent_installs: usize,
    /// How discovery treats a failing source.
    pub failure_policy: DiscoveryFailurePolicy,
    /// Platform whose artifacts are installed.
    pub platform: Platform,
}

impl ManagerConfig {
    /// Defaults for the given plugin root.
    #[must_use]
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            max_concurrent_installs: DEFAULT_MAX_CONCURRENT_INSTALLS,
            failure_policy: DiscoveryFailurePolicy::default(),
            platform: Platform::host(),
        }
    }

    /// Override the sync concurrency bound. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_installs(mut self, max: usize) -> Self {
        self.max_concurrent_installs = max.max(1);
        self
    }

    /// Override the discovery failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: DiscoveryFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Override the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// Options for [`PluginManager::delete_plugin`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletePluginOptions {
    /// Plugin name.
    pub name: String,
    /// Target, or [`Target::Unknown`] to resolve by name.
    pub target: Target,
    /// Log and continue when the binary cannot be removed.
    pub force_delete: bool,
}

/// Drives plugin discovery and the install lifecycle.
pub struct PluginManager {
    config: ManagerConfig,
    catalog: Arc<dyn Catalog>,
    transport: Arc<dyn Transport>,
    inspector: Arc<dyn PluginInspector>,
    trust: TrustPolicy,
    plan: DiscoveryPlan,
    install_lock: Mutex<()>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("config", &self.config)
            .field("trust", &self.trust)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Create a manager with the default trust policy and no discovery sources.
    #[must_use]
    pub fn new(
        config: ManagerConfig,
        catalog: Arc<dyn Catalog>,
        transport: Arc<dyn Transport>,
        inspector: Arc<dyn PluginInspector>,
    ) -> Self {
        Self {
            config,
            catalog,
            transport,
            inspector,
            trust: TrustPolicy::default(),
            plan: DiscoveryPlan::default(),
            install_lock: Mutex::new(()),
        }
    }

    /// Set the trust policy.
    #[must_use]
    pub fn with_trust_policy(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    /// Set the discovery sources.
    #[must_use]
    pub fn with_discovery_plan(mut self, plan: DiscoveryPlan) -> Self {
        self.plan = plan;
        self
    }

    /// The manager's configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The catalog installs are recorded in.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Query every configured source. Returns `(context_scoped, standalone)`.
    ///
    /// # Errors
    ///
    /// Returns a source failure under the fail-fast policy, or a missing
    /// manifest under either policy.
    pub async fn discover_plugins(
        &self,
    ) -> PluginResult<(Vec<DiscoveredPlugin>, Vec<DiscoveredPlugin>)> {
        discover_all(
            &self.plan,
            self.transport.as_ref(),
            &self.trust,
            &self.config.platform,
            self.config.failure_policy,
        )
        .await
    }

    /// The conflict-free view of discovered plugins and their install status.
    ///
    /// Installed standalone plugins that no source advertises any more are
    /// included as installed entries.
    ///
    /// # Errors
    ///
    /// Returns discovery or catalog errors.
    pub async fn available_plugins(&self) -> PluginResult<Vec<DiscoveredPlugin>> {
        let (mut discovered, standalone) = self.discover_plugins().await?;
        discovered.extend(standalone);
        let installed = self.catalog.installed().await?;
        Ok(available_view(discovered, &installed))
    }

    /// The plugins offered by a local directory, with their install status.
    ///
    /// # Errors
    ///
    /// Returns the directory read error, [`PluginError::ManifestNotFound`]
    /// when the directory has neither descriptors nor a manifest, or a
    /// catalog error.
    pub async fn available_plugins_from_local_source(
        &self,
        path: &Path,
    ) -> PluginResult<Vec<DiscoveredPlugin>> {
        let mut available = dedup(self.discover_local_source(path)?);
        let installed = self.catalog.installed().await?;
        resolve_status(&mut available, &installed);
        Ok(available)
    }

    /// Install a discovered plugin.
    ///
    /// Candidates are the deduplicated entries the configured sources
    /// advertise right now; installed records no source offers any more are
    /// not candidates. An empty or absent `version` installs the recommended
    /// version.
    ///
    /// # Errors
    ///
    /// - [`PluginError::NotFound`] when nothing matches the name.
    /// - [`PluginError::AmbiguousTarget`] when the name resolves to several
    ///   targets and `target` does not pick one.
    /// - [`PluginError::PreDownloadVerification`] for unknown versions,
    ///   missing artifacts and untrusted locations.
    /// - Transport, integrity, inspection, validation and catalog failures.
    pub async fn install_plugin(
        &self,
        name: &str,
        version: Option<&str>,
        target: Target,
    ) -> PluginResult<()> {
        let (mut discovered, standalone) = self.discover_plugins().await?;
        discovered.extend(standalone);
        let candidates = dedup(discovered);
        let entry = select_by_target(&candidates, name, target, |p| (p.name.as_str(), p.target))?;
        self.install_entry(entry, version).await.map(|_| ())
    }

    /// Install from a local directory instead of the configured sources.
    ///
    /// The name `all` (or `install_all`) installs every plugin the directory
    /// offers at its recommended version; `version` and `target` are then
    /// ignored.
    ///
    /// # Errors
    ///
    /// As [`Self::install_plugin`], plus the local source read errors of
    /// [`Self::available_plugins_from_local_source`].
    pub async fn install_plugins_from_local_source(
        &self,
        name: &str,
        version: Option<&str>,
        target: Target,
        path: &Path,
        install_all: bool,
    ) -> PluginResult<()> {
        let available = dedup(self.discover_local_source(path)?);

        if install_all || name == INSTALL_ALL {
            for entry in &available {
                self.install_entry(entry, None).await?;
            }
            return Ok(());
        }

        let entry = select_by_target(&available, name, target, |p| (p.name.as_str(), p.target))?;
        self.install_entry(entry, version).await.map(|_| ())
    }

    /// The installed record for `(name, target)`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] or [`PluginError::AmbiguousTarget`].
    pub async fn describe_plugin(&self, name: &str, target: Target) -> PluginResult<InstalledPlugin> {
        let installed = self.catalog.installed().await?;
        select_by_target(&installed, name, target, |r| (r.name.as_str(), r.target)).cloned()
    }

    /// Remove an installed plugin's binary and catalog record.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`], [`PluginError::AmbiguousTarget`],
    /// [`PluginError::CleanupFailed`] (unless forced) or a catalog error.
    pub async fn delete_plugin(&self, options: DeletePluginOptions) -> PluginResult<()> {
        let _guard = self.install_lock.lock().await;

        let installed = self.catalog.installed().await?;
        let record = select_by_target(&installed, &options.name, options.target, |r| {
            (r.name.as_str(), r.target)
        })?;

        if !record.install_path.as_os_str().is_empty()
            && let Err(e) = remove_plugin_binary(&record.install_path)
        {
            if !options.force_delete {
                return Err(PluginError::CleanupFailed {
                    name: record.name.clone(),
                    path: record.install_path.clone(),
                    message: e.to_string(),
                });
            }
            warn!(
                plugin = %record.name,
                path = %record.install_path.display(),
                error = %e,
                "Failed to remove plugin binary, continuing because of --force"
            );
        }

        self.catalog.remove(&record.name, record.target).await?;
        info!(plugin = %record.name, target = %record.target, "Deleted plugin");
        Ok(())
    }

    /// Install every available plugin that is not installed at the current
    /// recommendation.
    ///
    /// Every plugin is attempted, up to `max_concurrent_installs` at a time.
    ///
    /// # Errors
    ///
    /// Returns discovery or catalog errors from building the view, and
    /// [`PluginError::SyncFailed`] listing every plugin that failed.
    pub async fn sync_plugins(&self) -> PluginResult<()> {
        let pending: Vec<DiscoveredPlugin> = self
            .available_plugins()
            .await?
            .into_iter()
            .filter(|p| p.status != PluginStatus::Installed)
            .collect();

        if pending.is_empty() {
            debug!("All plugins are up to date");
            return Ok(());
        }

        info!(count = pending.len(), "Syncing plugins");

        let results: Vec<(String, Target, PluginResult<InstalledPlugin>)> =
            futures::stream::iter(pending.iter())
                .map(|entry| async move {
                    (
                        entry.name.clone(),
                        entry.target,
                        self.install_entry(entry, None).await,
                    )
                })
                .buffer_unordered(self.config.max_concurrent_installs.max(1))
                .collect()
                .await;

        let mut failures: Vec<String> = results
            .into_iter()
            .filter_map(|(name, target, result)| {
                result.err().map(|e| match target {
                    Target::Unknown => format!("{name}: {e}"),
                    target => format!("{name} ({target}): {e}"),
                })
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        failures.sort();
        Err(PluginError::SyncFailed { failures })
    }

    fn discover_local_source(&self, path: &Path) -> PluginResult<Vec<DiscoveredPlugin>> {
        let source = path.display().to_string();
        let descriptors = load_descriptor_dir(path)?;
        let (plugins, discovery_type) = if descriptors.is_empty() {
            (
                discover_from_manifest(path, &self.config.platform)?,
                DiscoveryType::Manifest,
            )
        } else {
            (descriptors, DiscoveryType::Local)
        };
        Ok(plugins
            .into_iter()
            .map(|p| p.with_source(source.clone(), discovery_type))
            .collect())
    }

    async fn install_entry(
        &self,
        entry: &DiscoveredPlugin,
        version: Option<&str>,
    ) -> PluginResult<InstalledPlugin> {
        let pre_download = |e| PluginError::pre_download(&entry.name, entry.target, e);

        let version = entry.resolve_version(version).map_err(pre_download)?;
        let artifact = entry
            .artifact_for(&version, &self.config.platform)
            .map_err(pre_download)?;
        self.trust
            .verify_pre_download(&artifact.location)
            .map_err(pre_download)?;

        debug!(
            plugin = %entry.name,
            target = %entry.target,
            version = %version,
            location = %artifact.location,
            "Fetching plugin artifact"
        );
        let bytes = self.transport.fetch(&artifact.location).await?;

        let _guard = self.install_lock.lock().await;

        verify_post_download(&entry.name, artifact.digest.as_deref(), &bytes)?;
        let digest = sha256_hex(&bytes);

        let install_path = plugin_binary_path(
            &self.config.plugin_root,
            &entry.name,
            &version,
            &digest,
            entry.target,
        )?;
        let write_path = install_path.clone();
        tokio::task::spawn_blocking(move || write_plugin_binary(&write_path, &bytes))
            .await
            .map_err(|e| PluginError::Io(std::io::Error::other(e)))??;

        let record = match self.inspect_into_record(entry, &version, &digest, &install_path).await {
            Ok(record) => record,
            Err(e) => {
                discard_binary(&install_path);
                return Err(e);
            },
        };

        let previous = self
            .catalog
            .installed()
            .await?
            .into_iter()
            .find(|r| r.is(&record.name, record.target));

        self.catalog.upsert(record.clone()).await?;

        if let Some(previous) = previous
            && !previous.install_path.as_os_str().is_empty()
            && previous.install_path != record.install_path
        {
            discard_binary(&previous.install_path);
        }

        info!(
            plugin = %record.name,
            target = %record.target,
            version = %record.version,
            scope = %record.scope,
            "Installed plugin"
        );
        Ok(record)
    }

    async fn inspect_into_record(
        &self,
        entry: &DiscoveredPlugin,
        version: &str,
        digest: &str,
        install_path: &Path,
    ) -> PluginResult<InstalledPlugin> {
        let info = self.inspector.inspect(install_path).await?;

        let description = if info.description.is_empty() {
            entry.description.clone()
        } else {
            info.description
        };

        let mut record = InstalledPlugin::new(&entry.name, entry.target, version)
            .with_discovered_recommended_version(&entry.recommended_version)
            .with_scope(entry.scope)
            .with_discovery_source(&entry.source)
            .with_group(info.group);
        record.description = description;
        record.install_path = install_path.to_path_buf();
        record.digest = digest.to_string();

        validate_plugin(&record)?;
        Ok(record)
    }
}

/// Check the fields every installed record must carry.
///
/// # Errors
///
/// Returns [`PluginError::InvalidPlugin`] listing every violation.
pub fn validate_plugin(record: &InstalledPlugin) -> PluginResult<()> {
    let mut violations = Vec::new();
    if record.name.is_empty() {
        violations.push("plugin name cannot be empty".to_string());
    }
    if record.version.is_empty() {
        violations.push(format!("plugin {:?} version cannot be empty", record.name));
    }
    if record.group.is_empty() {
        violations.push(format!("plugin {:?} group cannot be empty", record.name));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(PluginError::InvalidPlugin { violations })
    }
}

/// Pick the single item for `(name, target)`.
///
/// A concrete target selects exact matches, falling back to items without a
/// target. [`Target::Unknown`] selects every item with the name and must
/// resolve to a single target.
fn select_by_target<'a, T>(
    items: &'a [T],
    name: &str,
    target: Target,
    key: impl Fn(&T) -> (&str, Target),
) -> PluginResult<&'a T> {
    let named = || items.iter().filter(|item| key(*item).0 == name);

    let candidates: Vec<&T> = if target.is_concrete() {
        let exact: Vec<&T> = named().filter(|item| key(*item).1 == target).collect();
        if exact.is_empty() {
            named().filter(|item| !key(*item).1.is_concrete()).collect()
        } else {
            exact
        }
    } else {
        named().collect()
    };

    let targets: BTreeSet<Target> = candidates.iter().map(|item| key(*item).1).collect();
    if targets.len() > 1 {
        return Err(PluginError::AmbiguousTarget {
            name: name.to_string(),
        });
    }

    candidates
        .first()
        .copied()
        .ok_or_else(|| PluginError::NotFound {
            name: name.to_string(),
        })
}

fn discard_binary(path: &Path) {
    if let Err(e) = remove_plugin_binary(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove plugin binary");
    }
}
