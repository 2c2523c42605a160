//! Configuration struct definitions.
//!
//! These types mirror the TOML layout of `config.toml` one-to-one. They hold
//! plain strings and paths; conversion into plugin-manager types happens in
//! the CLI. Every struct implements [`Default`] and every section is
//! `#[serde(default)]`, so a partial file is always valid input.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The complete Plinth configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where plugins are discovered.
    pub discovery: DiscoverySection,
    /// Which registries artifacts may come from.
    pub trust: TrustSection,
    /// Where and how plugins are installed.
    pub install: InstallSection,
    /// Log output.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// DiscoverySection
// ---------------------------------------------------------------------------

/// How discovery reacts to a source that fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicyConfig {
    /// Abort on the first failing source.
    FailFast,
    /// Log the failure and use the remaining sources.
    #[default]
    Skip,
}

/// Kind of a discovery source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An OCI image holding a plugin inventory.
    Oci,
    /// A directory of plugin descriptors.
    #[default]
    Local,
    /// A directory described by `manifest.yaml` or `plugin_manifest.yaml`.
    Manifest,
}

/// One discovery source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Unique source name, recorded on every plugin it advertises.
    pub name: String,
    /// Source kind.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Inventory image reference. Required for `oci` sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Directory path. Required for `local` and `manifest` sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// A context and the sources that only apply while it is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    /// Context name.
    pub name: String,
    /// Target token (`k8s`, `tmc`, `global`, ...).
    pub target: String,
    /// Inactive contexts are ignored by discovery.
    pub active: bool,
    /// Sources of this context.
    pub sources: Vec<SourceSection>,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            target: String::new(),
            active: true,
            sources: Vec::new(),
        }
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Failure policy for individual sources.
    pub failure_policy: FailurePolicyConfig,
    /// Standalone sources.
    pub sources: Vec<SourceSection>,
    /// Contexts with their own sources.
    pub contexts: Vec<ContextSection>,
}

// ---------------------------------------------------------------------------
// TrustSection
// ---------------------------------------------------------------------------

/// Registry allow-list configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSection {
    /// Registries trusted in addition to the built-in ones.
    pub allowed_registries: Vec<String>,
    /// A single custom image repository, typically a mirror.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_image_repository: Option<String>,
}

// ---------------------------------------------------------------------------
// InstallSection
// ---------------------------------------------------------------------------

/// Install location and concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Directory plugin binaries are written to. Defaults to `<home>/plugins`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_root: Option<PathBuf>,
    /// Catalog file. Defaults to `<home>/catalog.toml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    /// Upper bound on concurrent installs during `plugin sync`.
    pub max_concurrent_installs: usize,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            plugin_root: None,
            catalog_path: None,
            max_concurrent_installs: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["plinth_plugins=debug"]`).
    pub directives: Vec<String>,
    /// Where events go: `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Log directory for the `file` target. Defaults to `<home>/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Log file rotation: `"daily"`, `"hourly"` or `"never"`.
    pub rotation: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            target: "stderr".to_owned(),
            directory: None,
            rotation: "daily".to_owned(),
        }
    }
}
