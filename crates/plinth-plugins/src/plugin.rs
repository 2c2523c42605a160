//! Core plugin types: identity, discovered entries and installed records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};
use crate::platform::Platform;

/// The platform or product family a plugin is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Target {
    /// Kubernetes clusters (`k8s`).
    Kubernetes,
    /// The mission-control SaaS plane (`tmc`).
    MissionControl,
    /// Host-level plugins that do not belong to a product.
    Global,
    /// No target recorded. Predates target-aware identity.
    #[default]
    Unknown,
}

impl Target {
    /// Parse a target token. Accepts long and short forms, case-insensitively;
    /// the empty string is [`Target::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidTarget`] for any other token.
    pub fn parse(token: &str) -> PluginResult<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "mission-control" | "tmc" => Ok(Self::MissionControl),
            "global" => Ok(Self::Global),
            "" | "unknown" | "none" => Ok(Self::Unknown),
            _ => Err(PluginError::InvalidTarget(token.to_string())),
        }
    }

    /// Whether this is a real target rather than the placeholder.
    #[must_use]
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Stable token used on disk and in paths. Empty for [`Target::Unknown`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::MissionControl => "mission-control",
            Self::Global => "global",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.as_str().to_string()
    }
}

impl TryFrom<String> for Target {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).map_err(|e| e.to_string())
    }
}

/// Whether a plugin is available everywhere or only inside a context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Available regardless of the active context.
    #[default]
    Standalone,
    /// Tied to an active connected context.
    Context,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => f.write_str("standalone"),
            Self::Context => f.write_str("context"),
        }
    }
}

/// Installation status of a discovered plugin. Derived, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginStatus {
    /// No matching installed record.
    #[default]
    NotInstalled,
    /// Installed under the recommendation that is still current.
    Installed,
    /// Installed, but the source has since changed its recommendation.
    UpdateAvailable,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => f.write_str("not installed"),
            Self::Installed => f.write_str("installed"),
            Self::UpdateAvailable => f.write_str("update available"),
        }
    }
}

/// Provenance tag recording which kind of source advertised a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryType {
    /// An OCI image inventory.
    Oci,
    /// A local directory of plugin descriptors.
    #[default]
    Local,
    /// A local directory described by a manifest file.
    Manifest,
}

impl fmt::Display for DiscoveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oci => f.write_str("oci"),
            Self::Local => f.write_str("local"),
            Self::Manifest => f.write_str("manifest"),
        }
    }
}

/// Where the bytes of a plugin binary can be retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactLocation {
    /// An OCI image reference (`registry/path:tag` or `registry/path@sha256:...`).
    Image(String),
    /// A direct download URL.
    Uri(String),
    /// A file on the local filesystem.
    Path(PathBuf),
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(image) => write!(f, "image:{image}"),
            Self::Uri(uri) => write!(f, "uri:{uri}"),
            Self::Path(path) => write!(f, "path:{}", path.display()),
        }
    }
}

/// A single platform-specific build of one plugin version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Operating system token (`linux`, `darwin`, `windows`).
    pub os: String,
    /// Architecture token (`amd64`, `arm64`).
    pub arch: String,
    /// Where to fetch the binary from.
    pub location: ArtifactLocation,
    /// Expected SHA-256 hex digest of the binary, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Artifact {
    /// Whether this artifact was built for the given platform.
    #[must_use]
    pub fn matches(&self, platform: &Platform) -> bool {
        self.os == platform.os && self.arch == platform.arch
    }
}

/// Every version a plugin offers, mapped to its per-platform artifacts.
pub type Distribution = BTreeMap<String, Vec<Artifact>>;

/// A candidate plugin as advertised by a discovery source.
///
/// Created fresh on every discovery pass; `installed_version` and `status`
/// are filled in by the resolution passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredPlugin {
    /// Plugin name.
    pub name: String,
    /// Short human-readable description.
    pub description: String,
    /// Version the source currently recommends.
    pub recommended_version: String,
    /// Versions on offer and their artifacts.
    pub distribution: Distribution,
    /// Standalone or context-scoped.
    pub scope: Scope,
    /// Platform family.
    pub target: Target,
    /// Owning context, set only for context-scoped entries.
    pub context_name: Option<String>,
    /// Name of the discovery source that advertised this entry.
    pub source: String,
    /// Kind of source that advertised this entry.
    pub discovery_type: DiscoveryType,
    /// Installed version, once resolved against the catalog.
    pub installed_version: Option<String>,
    /// Installation status, once resolved against the catalog.
    pub status: PluginStatus,
}

impl DiscoveredPlugin {
    /// Create a standalone entry with no versions on offer.
    #[must_use]
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            recommended_version: String::new(),
            distribution: Distribution::new(),
            scope: Scope::Standalone,
            target,
            context_name: None,
            source: String::new(),
            discovery_type: DiscoveryType::default(),
            installed_version: None,
            status: PluginStatus::NotInstalled,
        }
    }

    /// Set the recommended version.
    #[must_use]
    pub fn with_recommended_version(mut self, version: impl Into<String>) -> Self {
        self.recommended_version = version.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Mark the entry as context-scoped under the given context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.scope = Scope::Context;
        self.context_name = Some(context.into());
        self
    }

    /// Record the source that advertised this entry.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>, discovery_type: DiscoveryType) -> Self {
        self.source = source.into();
        self.discovery_type = discovery_type;
        self
    }

    /// Add an artifact for a version.
    #[must_use]
    pub fn with_artifact(mut self, version: impl Into<String>, artifact: Artifact) -> Self {
        self.distribution
            .entry(version.into())
            .or_default()
            .push(artifact);
        self
    }

    /// Versions this entry offers. The recommended version is always included.
    #[must_use]
    pub fn supported_versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.distribution.keys().map(String::as_str).collect();
        if !self.recommended_version.is_empty()
            && !versions.contains(&self.recommended_version.as_str())
        {
            versions.push(&self.recommended_version);
        }
        versions
    }

    /// Pick the version to install: the requested one, or the recommendation
    /// when no version is given.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::VersionNotFound`] when the requested version is
    /// not on offer.
    pub fn resolve_version(&self, requested: Option<&str>) -> PluginResult<String> {
        let version = match requested {
            Some(v) if !v.is_empty() => v,
            _ => self.recommended_version.as_str(),
        };
        if self.distribution.contains_key(version) {
            Ok(version.to_string())
        } else {
            Err(PluginError::VersionNotFound {
                name: self.name.clone(),
                version: version.to_string(),
            })
        }
    }

    /// Find the artifact of `version` built for `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::VersionNotFound`] or
    /// [`PluginError::ArtifactNotFound`].
    pub fn artifact_for(&self, version: &str, platform: &Platform) -> PluginResult<&Artifact> {
        let artifacts =
            self.distribution
                .get(version)
                .ok_or_else(|| PluginError::VersionNotFound {
                    name: self.name.clone(),
                    version: version.to_string(),
                })?;
        artifacts
            .iter()
            .find(|a| a.matches(platform))
            .ok_or_else(|| PluginError::ArtifactNotFound {
                name: self.name.clone(),
                version: version.to_string(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            })
    }
}

/// A row in the catalog of installed plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    /// Plugin name.
    pub name: String,
    /// Platform family. Absent in records written before targets existed.
    #[serde(default)]
    pub target: Target,
    /// Version actually installed.
    #[serde(default)]
    pub version: String,
    /// Scope of the discovered entry it was installed from.
    #[serde(default)]
    pub scope: Scope,
    /// Name of the discovery source it was installed from.
    #[serde(default)]
    pub discovery_source: String,
    /// The source's recommended version at install time.
    #[serde(default)]
    pub discovered_recommended_version: String,
    /// Short human-readable description.
    #[serde(default)]
    pub description: String,
    /// Command group reported by the plugin binary.
    #[serde(default)]
    pub group: String,
    /// Where the binary was written.
    #[serde(default)]
    pub install_path: PathBuf,
    /// SHA-256 hex digest of the installed binary.
    #[serde(default)]
    pub digest: String,
    /// When the plugin was installed or last updated.
    #[serde(default = "Utc::now")]
    pub installed_at: DateTime<Utc>,
}

impl InstalledPlugin {
    /// Create a record with the current timestamp.
    #[must_use]
    pub fn new(name: impl Into<String>, target: Target, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            name: name.into(),
            target,
            discovered_recommended_version: version.clone(),
            version,
            scope: Scope::Standalone,
            discovery_source: String::new(),
            description: String::new(),
            group: String::new(),
            install_path: PathBuf::new(),
            digest: String::new(),
            installed_at: Utc::now(),
        }
    }

    /// Set the recommendation recorded at install time.
    #[must_use]
    pub fn with_discovered_recommended_version(mut self, version: impl Into<String>) -> Self {
        self.discovered_recommended_version = version.into();
        self
    }

    /// Set the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the discovery source name.
    #[must_use]
    pub fn with_discovery_source(mut self, source: impl Into<String>) -> Self {
        self.discovery_source = source.into();
        self
    }

    /// Set the command group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Whether this record has the given identity.
    #[must_use]
    pub fn is(&self, name: &str, target: Target) -> bool {
        self.name == name && self.target == target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parse_accepts_short_and_long_forms() {
        assert_eq!(Target::parse("k8s").unwrap(), Target::Kubernetes);
        assert_eq!(Target::parse("Kubernetes").unwrap(), Target::Kubernetes);
        assert_eq!(Target::parse("tmc").unwrap(), Target::MissionControl);
        assert_eq!(
            Target::parse("mission-control").unwrap(),
            Target::MissionControl
        );
        assert_eq!(Target::parse("global").unwrap(), Target::Global);
        assert_eq!(Target::parse("").unwrap(), Target::Unknown);
        assert!(matches!(
            Target::parse("mainframe"),
            Err(PluginError::InvalidTarget(_))
        ));
    }

    #[test]
    fn target_round_trips_through_string() {
        for target in [
            Target::Kubernetes,
            Target::MissionControl,
            Target::Global,
            Target::Unknown,
        ] {
            let s: String = target.into();
            assert_eq!(Target::try_from(s).unwrap(), target);
        }
    }

    #[test]
    fn only_unknown_is_not_concrete() {
        assert!(Target::Kubernetes.is_concrete());
        assert!(Target::Global.is_concrete());
        assert!(!Target::Unknown.is_concrete());
    }

    #[test]
    fn status_display() {
        assert_eq!(PluginStatus::NotInstalled.to_string(), "not installed");
        assert_eq!(PluginStatus::UpdateAvailable.to_string(), "update available");
    }

    fn linux_artifact(path: &str) -> Artifact {
        Artifact {
            os: "linux".into(),
            arch: "amd64".into(),
            location: ArtifactLocation::Path(PathBuf::from(path)),
            digest: None,
        }
    }

    #[test]
    fn resolve_version_defaults_to_recommended() {
        let plugin = DiscoveredPlugin::new("login", Target::Unknown)
            .with_recommended_version("v0.2.0")
            .with_artifact("v0.2.0", linux_artifact("/a"))
            .with_artifact("v0.1.0", linux_artifact("/b"));

        assert_eq!(plugin.resolve_version(None).unwrap(), "v0.2.0");
        assert_eq!(plugin.resolve_version(Some("")).unwrap(), "v0.2.0");
        assert_eq!(plugin.resolve_version(Some("v0.1.0")).unwrap(), "v0.1.0");
        assert!(matches!(
            plugin.resolve_version(Some("v9.9.9")),
            Err(PluginError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn artifact_for_matches_platform() {
        let plugin = DiscoveredPlugin::new("login", Target::Unknown)
            .with_recommended_version("v0.2.0")
            .with_artifact("v0.2.0", linux_artifact("/a"));

        let linux = Platform::new("linux", "amd64");
        let darwin = Platform::new("darwin", "arm64");
        assert!(plugin.artifact_for("v0.2.0", &linux).is_ok());
        assert!(matches!(
            plugin.artifact_for("v0.2.0", &darwin),
            Err(PluginError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn legacy_record_without_target_deserializes_as_unknown() {
        let record: InstalledPlugin = toml::from_str(
            r#"
name = "login"
version = "v0.2.0"
"#,
        )
        .unwrap();
        assert_eq!(record.target, Target::Unknown);
        assert_eq!(record.scope, Scope::Standalone);
        assert!(record.discovered_recommended_version.is_empty());
    }
}
