//! Plugin error types.

use std::path::PathBuf;

use crate::plugin::Target;

/// Errors from plugin discovery, verification and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// No discovered or installed plugin matches the query.
    #[error("unable to find plugin '{name}'")]
    NotFound {
        /// Requested plugin name.
        name: String,
    },

    /// The plugin exists but does not offer the requested version.
    #[error("unable to find version '{version}' of plugin '{name}'")]
    VersionNotFound {
        /// Plugin name.
        name: String,
        /// Requested version.
        version: String,
    },

    /// The version exists but has no artifact for the host platform.
    #[error("plugin '{name}' version '{version}' has no artifact for {os}/{arch}")]
    ArtifactNotFound {
        /// Plugin name.
        name: String,
        /// Resolved version.
        version: String,
        /// Host operating system token.
        os: String,
        /// Host architecture token.
        arch: String,
    },

    /// The plugin name resolves to more than one target.
    #[error(
        "unable to uniquely identify plugin '{name}'. Please specify correct Target(kubernetes[k8s]/mission-control[tmc]) of the plugin with `--target` flag"
    )]
    AmbiguousTarget {
        /// Plugin name.
        name: String,
    },

    /// One or more required fields of an installed plugin record are missing.
    #[error("{}", .violations.join(", "))]
    InvalidPlugin {
        /// Every violation found, in field order.
        violations: Vec<String>,
    },

    /// A target token could not be parsed.
    #[error(
        "invalid target '{0}': expected one of kubernetes[k8s], mission-control[tmc], global"
    )]
    InvalidTarget(String),

    /// The image reference is not covered by any allowed registry.
    #[error(
        "untrusted image repository detected with image \"{image}\". Allowed repositories are [{}]",
        .allowed.join(" ")
    )]
    UntrustedRegistry {
        /// The rejected image reference.
        image: String,
        /// Every registry prefix that was consulted.
        allowed: Vec<String>,
    },

    /// The artifact URI does not start with a trusted base location.
    #[error(
        "untrusted artifact location detected with URI \"{uri}\". Allowed locations are [{}]",
        .allowed.join(" ")
    )]
    UntrustedLocation {
        /// The rejected URI.
        uri: String,
        /// Trusted base URIs.
        allowed: Vec<String>,
    },

    /// A check performed before fetching the artifact failed.
    #[error("plugin pre-download verification failed for plugin '{plugin}': {source}. {remedy}")]
    PreDownloadVerification {
        /// Plugin being installed.
        plugin: String,
        /// What the user can do about it.
        remedy: String,
        /// The failed check.
        #[source]
        source: Box<PluginError>,
    },

    /// Downloaded bytes do not match the advertised digest.
    #[error(
        "plugin \"{plugin}\" has been corrupted during download. source digest: {expected}, actual digest: {actual}"
    )]
    IntegrityMismatch {
        /// Plugin whose artifact failed verification.
        plugin: String,
        /// Digest advertised by the discovery source.
        expected: String,
        /// Digest of the retrieved bytes.
        actual: String,
    },

    /// Neither local manifest form exists in the directory.
    #[error(
        "could not find manifest.yaml file in {shown}; could not find plugin_manifest.yaml file in {shown}",
        shown = .dir.display()
    )]
    ManifestNotFound {
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// A local plugin source directory could not be read.
    #[error("unable to read local plugin source {}: {source}", .path.display())]
    LocalSource {
        /// The local source path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A discovery source failed to produce its plugin list.
    #[error("discovery source '{name}' failed: {message}")]
    Source {
        /// Name of the discovery source.
        name: String,
        /// Failure reason.
        message: String,
    },

    /// Artifact retrieval failed.
    #[error("failed to fetch artifact {location}: {message}")]
    Transport {
        /// The artifact location that was requested.
        location: String,
        /// Failure reason.
        message: String,
    },

    /// The installed binary could not describe itself.
    #[error("failed to inspect plugin binary {}: {message}", .path.display())]
    Inspect {
        /// Path to the plugin binary.
        path: PathBuf,
        /// Failure reason.
        message: String,
    },

    /// Catalog read/write/parse error.
    #[error("catalog error at {}: {message}", .path.display())]
    Catalog {
        /// Path to the catalog file.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// The installed binary for a plugin could not be removed.
    #[error("failed to remove plugin '{name}' binary at {}: {message}", .path.display())]
    CleanupFailed {
        /// Plugin name.
        name: String,
        /// Path that could not be removed.
        path: PathBuf,
        /// Failure reason.
        message: String,
    },

    /// One or more plugins failed to install during a sync.
    #[error("failed to sync {} plugin(s): {}", .failures.len(), .failures.join("; "))]
    SyncFailed {
        /// One entry per failed plugin.
        failures: Vec<String>,
    },

    /// A plugin name or version would place the binary outside the plugin root.
    #[error("plugin '{name}' version '{version}' is not a valid install path component")]
    UnsafeInstallPath {
        /// Plugin name.
        name: String,
        /// Plugin version.
        version: String,
    },

    /// A metadata document could not be parsed.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// The document that failed to parse.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Wrap a failed pre-download check with the action that resolves it.
    #[must_use]
    pub fn pre_download(plugin: &str, target: Target, source: Self) -> Self {
        let remedy = match &source {
            Self::UntrustedRegistry { .. } => {
                "Add the registry to PLINTH_ALLOWED_REGISTRIES to trust it".to_string()
            },
            Self::UntrustedLocation { .. } => {
                "Only artifacts served from the allowed locations can be installed".to_string()
            },
            Self::VersionNotFound { .. } | Self::ArtifactNotFound { .. } => {
                let for_target = if target.is_concrete() {
                    format!(" for target '{target}'")
                } else {
                    String::new()
                };
                format!(
                    "Run `plinth plugin list` to see the versions available{for_target} and pass one with `--version`"
                )
            },
            _ => "Check the discovery source configuration".to_string(),
        };
        Self::PreDownloadVerification {
            plugin: plugin.to_string(),
            remedy,
            source: Box::new(source),
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_target_names_flag() {
        let err = PluginError::AmbiguousTarget {
            name: "cluster".into(),
        };
        assert_eq!(
            err.to_string(),
            "unable to uniquely identify plugin 'cluster'. Please specify correct Target(kubernetes[k8s]/mission-control[tmc]) of the plugin with `--target` flag"
        );
    }

    #[test]
    fn invalid_plugin_lists_every_violation() {
        let err = PluginError::InvalidPlugin {
            violations: vec!["a cannot be empty".into(), "b cannot be empty".into()],
        };
        assert_eq!(err.to_string(), "a cannot be empty, b cannot be empty");
    }

    #[test]
    fn manifest_not_found_names_both_files() {
        let err = PluginError::ManifestNotFound {
            dir: PathBuf::from("/tmp/local"),
        };
        let msg = err.to_string();
        assert!(msg.contains("could not find manifest.yaml file"));
        assert!(msg.contains("could not find plugin_manifest.yaml file"));
    }

    #[test]
    fn pre_download_names_registry_setting() {
        let err = PluginError::pre_download(
            "login",
            Target::Unknown,
            PluginError::UntrustedRegistry {
                image: "evil.io/login:v1".into(),
                allowed: vec![],
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("plugin pre-download verification failed"));
        assert!(msg.contains("PLINTH_ALLOWED_REGISTRIES"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn pre_download_version_remedy_names_flag_and_target() {
        let missing = || PluginError::VersionNotFound {
            name: "cluster".into(),
            version: "v9.9.9".into(),
        };

        let msg = PluginError::pre_download("cluster", Target::MissionControl, missing()).to_string();
        assert!(msg.contains("versions available for target 'mission-control'"));
        assert!(msg.contains("`--version`"));

        let msg = PluginError::pre_download("login", Target::Unknown, missing()).to_string();
        assert!(msg.contains("versions available and pass one with `--version`"));
        assert!(!msg.contains("target ''"));
    }
}
