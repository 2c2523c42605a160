//! Discovery sources and the aggregator that queries them.
//!
//! Every source yields a list of [`DiscoveredPlugin`] entries. The aggregator
//! runs all configured sources concurrently and tags each entry with the
//! source that produced it, so later passes can tell standalone and
//! context-scoped entries apart.

pub mod descriptor;
pub mod manifest;

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::platform::Platform;
use crate::plugin::{ArtifactLocation, DiscoveredPlugin, DiscoveryType, Target};
use crate::transport::Transport;
use crate::trust::TrustPolicy;

pub use descriptor::{load_descriptor_dir, parse_inventory};
pub use manifest::discover_from_manifest;

/// Reject a plugin name or version that cannot be used as one path component
/// of the install layout.
fn check_path_segment(origin: &Path, what: &str, value: &str) -> PluginResult<()> {
    if crate::install_dirs::is_path_segment(value) {
        return Ok(());
    }
    Err(PluginError::Parse {
        path: origin.to_path_buf(),
        message: format!("{what} {value:?} must be a single path component"),
    })
}

/// A configured place plugin metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverySource {
    /// An OCI image whose single layer is an inventory document.
    Oci {
        /// Source name, recorded on every entry it yields.
        name: String,
        /// Image reference of the inventory.
        image: String,
    },
    /// A directory holding one descriptor per YAML file.
    LocalDir {
        /// Source name.
        name: String,
        /// Directory path.
        path: PathBuf,
    },
    /// A directory described by `manifest.yaml` or `plugin_manifest.yaml`.
    LegacyManifest {
        /// Source name.
        name: String,
        /// Directory path.
        path: PathBuf,
    },
}

impl DiscoverySource {
    /// The source name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Oci { name, .. } | Self::LocalDir { name, .. } | Self::LegacyManifest { name, .. } => {
                name
            },
        }
    }

    /// The provenance tag for entries this source yields.
    #[must_use]
    pub fn discovery_type(&self) -> DiscoveryType {
        match self {
            Self::Oci { .. } => DiscoveryType::Oci,
            Self::LocalDir { .. } => DiscoveryType::Local,
            Self::LegacyManifest { .. } => DiscoveryType::Manifest,
        }
    }

    /// List the plugins this source advertises.
    ///
    /// Entries are returned untagged; [`discover_all`] records provenance.
    ///
    /// # Errors
    ///
    /// Returns the underlying failure: an untrusted inventory registry, a
    /// transport error, an unreadable directory or a malformed document.
    pub async fn list(
        &self,
        transport: &dyn Transport,
        trust: &TrustPolicy,
        platform: &Platform,
    ) -> PluginResult<Vec<DiscoveredPlugin>> {
        match self {
            Self::Oci { image, .. } => {
                trust.verify_registry(image)?;
                let bytes = transport
                    .fetch(&ArtifactLocation::Image(image.clone()))
                    .await?;
                parse_inventory(&bytes, Path::new(image))
            },
            Self::LocalDir { path, .. } => load_descriptor_dir(path),
            Self::LegacyManifest { path, .. } => discover_from_manifest(path, platform),
        }
    }
}

/// Sources attached to one active context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDiscovery {
    /// Context name.
    pub name: String,
    /// Target of the context. Context entries without a target inherit it.
    pub target: Target,
    /// Sources queried for this context.
    pub sources: Vec<DiscoverySource>,
}

/// Every source to query in one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryPlan {
    /// Sources available regardless of context.
    pub standalone: Vec<DiscoverySource>,
    /// Active contexts and their sources.
    pub contexts: Vec<ContextDiscovery>,
}

impl DiscoveryPlan {
    /// Whether the plan has no sources at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.standalone.is_empty() && self.contexts.iter().all(|c| c.sources.is_empty())
    }
}

/// What to do when a single source fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryFailurePolicy {
    /// Abort the pass with the first failure.
    FailFast,
    /// Log the failure and keep the other sources' results.
    #[default]
    SkipAndContinue,
}

/// Query every source in the plan concurrently.
///
/// Returns `(context_scoped, standalone)` entries in plan order. A missing
/// manifest is always escalated as [`PluginError::ManifestNotFound`]; other
/// source failures are reported as [`PluginError::Source`] and follow
/// `policy`.
///
/// # Errors
///
/// See above.
pub async fn discover_all(
    plan: &DiscoveryPlan,
    transport: &dyn Transport,
    trust: &TrustPolicy,
    platform: &Platform,
    policy: DiscoveryFailurePolicy,
) -> PluginResult<(Vec<DiscoveredPlugin>, Vec<DiscoveredPlugin>)> {
    let jobs: Vec<(Option<&ContextDiscovery>, &DiscoverySource)> = plan
        .standalone
        .iter()
        .map(|source| (None, source))
        .chain(
            plan.contexts
                .iter()
                .flat_map(|ctx| ctx.sources.iter().map(move |source| (Some(ctx), source))),
        )
        .collect();

    let results = join_all(
        jobs.iter()
            .map(|(_, source)| source.list(transport, trust, platform)),
    )
    .await;

    let mut context_plugins = Vec::new();
    let mut standalone_plugins = Vec::new();

    for ((context, source), result) in jobs.into_iter().zip(results) {
        let entries = match result {
            Ok(entries) => entries,
            Err(e @ PluginError::ManifestNotFound { .. }) => return Err(e),
            Err(e) => {
                let err = PluginError::Source {
                    name: source.name().to_string(),
                    message: e.to_string(),
                };
                match policy {
                    DiscoveryFailurePolicy::FailFast => return Err(err),
                    DiscoveryFailurePolicy::SkipAndContinue => {
                        warn!(source = %source.name(), error = %e, "Skipping failed discovery source");
                        continue;
                    },
                }
            },
        };

        debug!(source = %source.name(), count = entries.len(), "Discovery source listed plugins");

        for entry in entries {
            let entry = entry.with_source(source.name(), source.discovery_type());
            match context {
                Some(ctx) => {
                    let mut entry = entry.with_context(&ctx.name);
                    if !entry.target.is_concrete() {
                        entry.target = ctx.target;
                    }
                    context_plugins.push(entry);
                },
                None => standalone_plugins.push(entry),
            }
        }
    }

    Ok((context_plugins, standalone_plugins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Scope;
    use crate::transport::FileTransport;

    fn write_descriptor(dir: &Path, name: &str, target: Option<&str>) {
        let target = target.map(|t| format!("target: {t}\n")).unwrap_or_default();
        std::fs::write(
            dir.join(format!("{name}.yaml")),
            format!("name: {name}\n{target}recommendedVersion: v1.0.0\n"),
        )
        .unwrap();
    }

    fn linux() -> Platform {
        Platform::new("linux", "amd64")
    }

    #[tokio::test]
    async fn entries_are_tagged_with_provenance() {
        let standalone = tempfile::tempdir().unwrap();
        let context = tempfile::tempdir().unwrap();
        write_descriptor(standalone.path(), "login", None);
        write_descriptor(context.path(), "cluster", None);

        let plan = DiscoveryPlan {
            standalone: vec![DiscoverySource::LocalDir {
                name: "default-local".into(),
                path: standalone.path().to_path_buf(),
            }],
            contexts: vec![ContextDiscovery {
                name: "prod".into(),
                target: Target::MissionControl,
                sources: vec![DiscoverySource::LocalDir {
                    name: "prod-local".into(),
                    path: context.path().to_path_buf(),
                }],
            }],
        };

        let (ctx, alone) = discover_all(
            &plan,
            &FileTransport,
            &TrustPolicy::default(),
            &linux(),
            DiscoveryFailurePolicy::FailFast,
        )
        .await
        .unwrap();

        assert_eq!(alone.len(), 1);
        assert_eq!(alone[0].source, "default-local");
        assert_eq!(alone[0].discovery_type, DiscoveryType::Local);
        assert_eq!(alone[0].scope, Scope::Standalone);
        assert_eq!(alone[0].target, Target::Unknown);

        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].scope, Scope::Context);
        assert_eq!(ctx[0].context_name.as_deref(), Some("prod"));
        assert_eq!(ctx[0].target, Target::MissionControl);
    }

    #[tokio::test]
    async fn failing_source_is_skipped_or_fatal() {
        let good = tempfile::tempdir().unwrap();
        write_descriptor(good.path(), "login", Some("k8s"));
        let plan = DiscoveryPlan {
            standalone: vec![
                DiscoverySource::LocalDir {
                    name: "broken".into(),
                    path: PathBuf::from("/no/such/source"),
                },
                DiscoverySource::LocalDir {
                    name: "good".into(),
                    path: good.path().to_path_buf(),
                },
            ],
            contexts: vec![],
        };
        let trust = TrustPolicy::default();

        let (_, alone) = discover_all(
            &plan,
            &FileTransport,
            &trust,
            &linux(),
            DiscoveryFailurePolicy::SkipAndContinue,
        )
        .await
        .unwrap();
        assert_eq!(alone.len(), 1);
        assert_eq!(alone[0].name, "login");

        let err = discover_all(
            &plan,
            &FileTransport,
            &trust,
            &linux(),
            DiscoveryFailurePolicy::FailFast,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PluginError::Source { ref name, .. } if name == "broken"));
    }

    #[tokio::test]
    async fn missing_manifest_is_escalated() {
        let empty = tempfile::tempdir().unwrap();
        let plan = DiscoveryPlan {
            standalone: vec![DiscoverySource::LegacyManifest {
                name: "local".into(),
                path: empty.path().to_path_buf(),
            }],
            contexts: vec![],
        };

        let err = discover_all(
            &plan,
            &FileTransport,
            &TrustPolicy::default(),
            &linux(),
            DiscoveryFailurePolicy::SkipAndContinue,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PluginError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn oci_inventory_from_untrusted_registry_is_rejected() {
        let source = DiscoverySource::Oci {
            name: "default".into(),
            image: "evil.example.com/plugins/inventory:latest".into(),
        };
        let err = source
            .list(&FileTransport, &TrustPolicy::default(), &linux())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::UntrustedRegistry { .. }));
    }

    #[test]
    fn empty_plan() {
        assert!(DiscoveryPlan::default().is_empty());
    }
}
