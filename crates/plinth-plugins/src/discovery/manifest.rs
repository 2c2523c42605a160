//! Manifest-based local discovery.
//!
//! A local directory may describe its plugins with one of two manifest forms,
//! tried in this order:
//!
//! - `manifest.yaml` (legacy): `plugins: [{ name, description, versions }]`.
//!   Entries have no target and are reported as [`Target::Unknown`]; the first
//!   listed version is the recommended one. Binaries live under
//!   `distribution/<os>/<arch>/cli/<name>/<version>/`.
//! - `plugin_manifest.yaml`: `plugins: [{ name, description, target, version }]`.
//!   An entry without a target is [`Target::Global`], not Unknown. Binaries
//!   live under `<os>/<arch>/<target>/<name>/<version>/`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::check_path_segment;
use crate::error::{PluginError, PluginResult};
use crate::platform::Platform;
use crate::plugin::{Artifact, ArtifactLocation, DiscoveredPlugin, Target};

/// File name of the legacy manifest form.
pub const LEGACY_MANIFEST_FILE: &str = "manifest.yaml";

/// File name of the target-aware manifest form.
pub const PLUGIN_MANIFEST_FILE: &str = "plugin_manifest.yaml";

#[derive(Debug, Deserialize)]
struct LegacyManifest {
    #[serde(default)]
    plugins: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PluginManifest {
    #[serde(default)]
    plugins: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    target: Option<String>,
    version: String,
}

/// Discover the plugins described by whichever manifest `dir` contains.
///
/// # Errors
///
/// Returns [`PluginError::ManifestNotFound`] when neither manifest exists,
/// [`PluginError::LocalSource`] on other read failures and
/// [`PluginError::Parse`] on malformed manifests.
pub fn discover_from_manifest(dir: &Path, platform: &Platform) -> PluginResult<Vec<DiscoveredPlugin>> {
    if let Some(content) = read_optional(&dir.join(LEGACY_MANIFEST_FILE))? {
        let manifest: LegacyManifest = parse(&dir.join(LEGACY_MANIFEST_FILE), &content)?;
        debug!(dir = %dir.display(), plugins = manifest.plugins.len(), "Loaded legacy manifest");
        return manifest
            .plugins
            .into_iter()
            .map(|entry| legacy_plugin(dir, platform, entry))
            .collect();
    }

    if let Some(content) = read_optional(&dir.join(PLUGIN_MANIFEST_FILE))? {
        let manifest: PluginManifest = parse(&dir.join(PLUGIN_MANIFEST_FILE), &content)?;
        debug!(dir = %dir.display(), plugins = manifest.plugins.len(), "Loaded plugin manifest");
        return manifest
            .plugins
            .into_iter()
            .map(|entry| manifest_plugin(dir, platform, entry))
            .collect();
    }

    Err(PluginError::ManifestNotFound {
        dir: dir.to_path_buf(),
    })
}

/// Path of a binary in the legacy directory layout.
#[must_use]
pub fn legacy_artifact_path(dir: &Path, platform: &Platform, name: &str, version: &str) -> PathBuf {
    dir.join("distribution")
        .join(&platform.os)
        .join(&platform.arch)
        .join("cli")
        .join(name)
        .join(version)
        .join(platform.binary_name(name))
}

/// Path of a binary in the target-aware directory layout.
#[must_use]
pub fn artifact_path(
    dir: &Path,
    platform: &Platform,
    target: Target,
    name: &str,
    version: &str,
) -> PathBuf {
    dir.join(&platform.os)
        .join(&platform.arch)
        .join(target.as_str())
        .join(name)
        .join(version)
        .join(platform.binary_name(name))
}

fn legacy_plugin(dir: &Path, platform: &Platform, entry: LegacyEntry) -> PluginResult<DiscoveredPlugin> {
    let origin = dir.join(LEGACY_MANIFEST_FILE);
    check_path_segment(&origin, "plugin name", &entry.name)?;
    for version in &entry.versions {
        check_path_segment(&origin, "version", version)?;
    }

    let recommended = entry.versions.first().cloned().unwrap_or_default();
    let mut plugin = DiscoveredPlugin::new(&entry.name, Target::Unknown)
        .with_recommended_version(recommended)
        .with_description(entry.description);
    for version in entry.versions {
        let path = legacy_artifact_path(dir, platform, &entry.name, &version);
        plugin = plugin.with_artifact(version, local_artifact(platform, path));
    }
    Ok(plugin)
}

fn manifest_plugin(dir: &Path, platform: &Platform, entry: ManifestEntry) -> PluginResult<DiscoveredPlugin> {
    let origin = dir.join(PLUGIN_MANIFEST_FILE);
    check_path_segment(&origin, "plugin name", &entry.name)?;
    check_path_segment(&origin, "version", &entry.version)?;

    let target = match entry.target.as_deref().map(Target::parse).transpose()? {
        Some(target) if target.is_concrete() => target,
        _ => Target::Global,
    };
    let path = artifact_path(dir, platform, target, &entry.name, &entry.version);
    Ok(DiscoveredPlugin::new(entry.name, target)
        .with_recommended_version(entry.version.clone())
        .with_description(entry.description)
        .with_artifact(entry.version, local_artifact(platform, path)))
}

fn local_artifact(platform: &Platform, path: PathBuf) -> Artifact {
    Artifact {
        os: platform.os.clone(),
        arch: platform.arch.clone(),
        location: ArtifactLocation::Path(path),
        digest: None,
    }
}

fn read_optional(path: &Path) -> PluginResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PluginError::LocalSource {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> PluginResult<T> {
    serde_yaml::from_str(content).map_err(|e| PluginError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
