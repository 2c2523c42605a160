//! Plugin descriptor documents.
//!
//! A descriptor advertises one plugin: its identity, the recommended version
//! and the per-platform artifacts of every version on offer. OCI sources ship
//! an inventory (`plugins: [descriptor, ...]`); local directories hold one
//! descriptor per `*.yaml` file.
//!
//! ```yaml
//! name: login
//! description: Log in to a server
//! target: k8s
//! recommendedVersion: v0.2.0
//! artifacts:
//!   v0.2.0:
//!     - os: linux
//!       arch: amd64
//!       path: distribution/linux/amd64/v0.2.0/plinth-login
//!       digest: e3b0c442...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::check_path_segment;
use super::manifest::{LEGACY_MANIFEST_FILE, PLUGIN_MANIFEST_FILE};
use crate::error::{PluginError, PluginResult};
use crate::plugin::{Artifact, ArtifactLocation, DiscoveredPlugin, Target};

/// One plugin as described by a discovery source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Plugin name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Target token. Missing means [`Target::Unknown`].
    #[serde(default)]
    pub target: Target,
    /// Version the source recommends.
    pub recommended_version: String,
    /// Artifacts per version.
    #[serde(default)]
    pub artifacts: BTreeMap<String, Vec<ArtifactDescriptor>>,
}

/// A per-platform artifact entry. Exactly one of `image`, `uri` or `path` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactDescriptor {
    /// Operating system token.
    pub os: String,
    /// Architecture token.
    pub arch: String,
    /// OCI image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Direct download URL.
    #[serde(default)]
    pub uri: Option<String>,
    /// Filesystem path, relative paths resolve against the source directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// SHA-256 hex digest.
    #[serde(default)]
    pub digest: Option<String>,
}

/// An OCI inventory document.
#[derive(Debug, Clone, Deserialize)]
pub struct Inventory {
    /// Every plugin in the inventory.
    #[serde(default)]
    pub plugins: Vec<PluginDescriptor>,
}

impl PluginDescriptor {
    /// Convert into a discovered entry.
    ///
    /// `base_dir` is the local directory the descriptor was read from and
    /// anchors relative paths. Remote documents pass `None` and may not name
    /// filesystem paths at all.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Parse`] when the name or a version is not a
    /// single path component, or an artifact does not name exactly one
    /// allowed location. `origin` identifies the document in the error.
    pub fn into_discovered(
        self,
        base_dir: Option<&Path>,
        origin: &Path,
    ) -> PluginResult<DiscoveredPlugin> {
        check_path_segment(origin, "plugin name", &self.name)?;
        if !self.recommended_version.is_empty() {
            check_path_segment(origin, "recommended version", &self.recommended_version)?;
        }

        let mut plugin = DiscoveredPlugin::new(self.name, self.target)
            .with_recommended_version(self.recommended_version)
            .with_description(self.description);

        for (version, artifacts) in self.artifacts {
            check_path_segment(origin, "version", &version)?;
            for artifact in artifacts {
                if base_dir.is_none() && artifact.path.is_some() {
                    return Err(PluginError::Parse {
                        path: origin.to_path_buf(),
                        message: format!(
                            "artifact {}/{} of {} {version} names a filesystem path, which only local sources may do",
                            artifact.os, artifact.arch, plugin.name
                        ),
                    });
                }
                let location = artifact.location(base_dir).ok_or_else(|| PluginError::Parse {
                    path: origin.to_path_buf(),
                    message: format!(
                        "artifact {}/{} of {} {version} must set exactly one of image, uri or path",
                        artifact.os, artifact.arch, plugin.name
                    ),
                })?;
                plugin = plugin.with_artifact(
                    version.clone(),
                    Artifact {
                        os: artifact.os,
                        arch: artifact.arch,
                        location,
                        digest: artifact.digest.filter(|d| !d.is_empty()),
                    },
                );
            }
        }

        Ok(plugin)
    }
}

impl ArtifactDescriptor {
    fn location(&self, base_dir: Option<&Path>) -> Option<ArtifactLocation> {
        match (&self.image, &self.uri, &self.path) {
            (Some(image), None, None) => Some(ArtifactLocation::Image(image.clone())),
            (None, Some(uri), None) => Some(ArtifactLocation::Uri(uri.clone())),
            (None, None, Some(path)) => Some(ArtifactLocation::Path(match base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            })),
            _ => None,
        }
    }
}

/// Parse an OCI inventory document.
///
/// Inventory artifacts must be images or URIs; a remote document cannot point
/// the installer at a local file.
///
/// # Errors
///
/// Returns [`PluginError::Parse`] on malformed YAML or artifacts.
pub fn parse_inventory(bytes: &[u8], origin: &Path) -> PluginResult<Vec<DiscoveredPlugin>> {
    let inventory: Inventory = serde_yaml::from_slice(bytes).map_err(|e| PluginError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;
    inventory
        .plugins
        .into_iter()
        .map(|d| d.into_discovered(None, origin))
        .collect()
}

/// Read every descriptor file in a local directory, in file-name order.
///
/// Manifest files are skipped; they belong to manifest-based discovery.
///
/// # Errors
///
/// Returns [`PluginError::LocalSource`] if the directory cannot be read and
/// [`PluginError::Parse`] for malformed descriptors.
pub fn load_descriptor_dir(dir: &Path) -> PluginResult<Vec<DiscoveredPlugin>> {
    let read_err = |source| PluginError::LocalSource {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(read_err)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_descriptor_file(path))
        .collect();
    files.sort();

    let mut plugins = Vec::with_capacity(files.len());
    for file in files {
        let content = std::fs::read_to_string(&file).map_err(|source| PluginError::LocalSource {
            path: file.clone(),
            source,
        })?;
        let descriptor: PluginDescriptor =
            serde_yaml::from_str(&content).map_err(|e| PluginError::Parse {
                path: file.clone(),
                message: e.to_string(),
            })?;
        debug!(path = %file.display(), plugin = %descriptor.name, "Loaded plugin descriptor");
        plugins.push(descriptor.into_discovered(Some(dir), &file)?);
    }

    Ok(plugins)
}

fn is_descriptor_file(path: &Path) -> bool {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml");
    let is_manifest = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == LEGACY_MANIFEST_FILE || n == PLUGIN_MANIFEST_FILE);
    is_yaml && !is_manifest && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = r"
name: login
description: Log in to a server
recommendedVersion: v0.2.0
artifacts:
  v0.2.0:
    - os: linux
      arch: amd64
      path: bin/plinth-login
      digest: abc123
    - os: darwin
      arch: arm64
      uri: https://plinth-cli.s3-us-west-2.amazonaws.com/plugins/artifacts/login
  v0.1.0:
    - os: linux
      arch: amd64
      image: projects.registry.plinth.dev/plinth-cli/plugins/login:v0.1.0
";

    #[test]
    fn descriptor_defaults_to_unknown_target() {
        let d: PluginDescriptor = serde_yaml::from_str(LOGIN).unwrap();
        assert_eq!(d.target, Target::Unknown);
        assert_eq!(d.recommended_version, "v0.2.0");
    }

    #[test]
    fn relative_paths_resolve_against_directory() {
        let d: PluginDescriptor = serde_yaml::from_str(LOGIN).unwrap();
        let plugin = d
            .into_discovered(Some(Path::new("/srv/plugins")), Path::new("login.yaml"))
            .unwrap();

        let v2 = &plugin.distribution["v0.2.0"];
        assert_eq!(
            v2[0].location,
            ArtifactLocation::Path(PathBuf::from("/srv/plugins/bin/plinth-login"))
        );
        assert_eq!(v2[0].digest.as_deref(), Some("abc123"));
        assert!(matches!(v2[1].location, ArtifactLocation::Uri(_)));
        assert!(matches!(
            plugin.distribution["v0.1.0"][0].location,
            ArtifactLocation::Image(_)
        ));
        assert_eq!(plugin.supported_versions(), vec!["v0.1.0", "v0.2.0"]);
    }

    #[test]
    fn artifact_with_two_locations_is_rejected() {
        let yaml = r"
name: bad
recommendedVersion: v1
artifacts:
  v1:
    - os: linux
      arch: amd64
      uri: https://example.com/a
      path: a
";
        let d: PluginDescriptor = serde_yaml::from_str(yaml).unwrap();
        let err = d.into_discovered(None, Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, PluginError::Parse { .. }));
    }

    #[test]
    fn traversing_names_and_versions_are_rejected() {
        for yaml in [
            "name: ../../escaped\nrecommendedVersion: v1\n",
            "name: nested/login\nrecommendedVersion: v1\n",
            "name: login\nrecommendedVersion: ../v1\n",
            "name: login\nrecommendedVersion: v1\nartifacts:\n  ..:\n    - os: linux\n      arch: amd64\n      uri: https://example.com/a\n",
        ] {
            let d: PluginDescriptor = serde_yaml::from_str(yaml).unwrap();
            let err = d
                .into_discovered(Some(Path::new("/srv/plugins")), Path::new("evil.yaml"))
                .unwrap_err();
            assert!(matches!(err, PluginError::Parse { .. }), "{yaml}");
            assert!(err.to_string().contains("single path component"));
        }
    }

    #[test]
    fn inventory_rejects_path_artifacts() {
        let yaml = r"
plugins:
  - name: login
    recommendedVersion: v0.2.0
    artifacts:
      v0.2.0:
        - os: linux
          arch: amd64
          path: /usr/local/bin/anything
";
        let err = parse_inventory(yaml.as_bytes(), Path::new("inventory")).unwrap_err();
        assert!(matches!(err, PluginError::Parse { .. }));
        assert!(err.to_string().contains("only local sources"));
    }

    #[test]
    fn inventory_parses_all_plugins() {
        let yaml = r"
plugins:
  - name: cluster
    target: k8s
    recommendedVersion: v1.6.0
  - name: cluster
    target: tmc
    recommendedVersion: v0.2.0
";
        let plugins = parse_inventory(yaml.as_bytes(), Path::new("inventory")).unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[0].target, Target::Kubernetes);
        assert_eq!(plugins[1].target, Target::MissionControl);
    }

    #[test]
    fn descriptor_dir_skips_manifests_and_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("login.yaml"), LOGIN).unwrap();
        std::fs::write(tmp.path().join("manifest.yaml"), "plugins: []").unwrap();
        std::fs::write(tmp.path().join("README.md"), "# plugins").unwrap();

        let plugins = load_descriptor_dir(tmp.path()).unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "login");
    }

    #[test]
    fn missing_directory_reports_io_error() {
        let err = load_descriptor_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, PluginError::LocalSource { .. }));
        assert!(err.to_string().contains("No such file or directory"));
    }
}
