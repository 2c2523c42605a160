//! Provenance and integrity gates for plugin artifacts.
//!
//! Three independent checks, each of which aborts an install:
//!
//! - [`TrustPolicy::verify_registry`]: image references must live under an
//!   allowed registry path (compiled-in defaults, a custom image repository,
//!   or an explicit allow-list). Nothing configured means nothing is trusted.
//! - [`TrustPolicy::verify_artifact_location`]: direct download URLs must
//!   start with a trusted base location.
//! - [`verify_post_download`]: retrieved bytes must match the advertised
//!   SHA-256 digest, when one is advertised.

mod integrity;
mod registry;

pub use integrity::{sha256_hex, verify_post_download};
pub use registry::{covers, parse_registry_list, repository_of};

use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::plugin::ArtifactLocation;

/// Registries trusted without any configuration.
pub const DEFAULT_ALLOWED_REGISTRIES: &[&str] = &["projects.registry.plinth.dev/plinth-cli/plugins"];

/// Base URIs from which direct artifact downloads are accepted.
pub const TRUSTED_ARTIFACT_LOCATIONS: &[&str] = &[
    "https://storage.googleapis.com/plinth-cli-advanced-plugins/",
    "https://plinth-cli.s3-us-west-2.amazonaws.com/plugins/artifacts",
];

/// Which registries and download locations artifacts may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Compiled-in registry allow-list.
    pub default_registries: Vec<String>,
    /// A single custom image repository configured by the user.
    pub custom_image_repository: Option<String>,
    /// Additional allowed registries.
    pub allowed_registries: Vec<String>,
    /// Trusted base URIs for direct downloads.
    pub trusted_locations: Vec<String>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            default_registries: DEFAULT_ALLOWED_REGISTRIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            custom_image_repository: None,
            allowed_registries: Vec::new(),
            trusted_locations: TRUSTED_ARTIFACT_LOCATIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl TrustPolicy {
    /// A policy that trusts no registry. Download locations keep their defaults.
    #[must_use]
    pub fn deny_all_registries() -> Self {
        Self {
            default_registries: Vec::new(),
            ..Self::default()
        }
    }

    /// Replace the compiled-in registry list.
    #[must_use]
    pub fn with_default_registries(mut self, registries: Vec<String>) -> Self {
        self.default_registries = registries;
        self
    }

    /// Set the custom image repository. Blank values are ignored.
    #[must_use]
    pub fn with_custom_image_repository(mut self, repository: impl Into<String>) -> Self {
        let repository = repository.into();
        self.custom_image_repository = (!repository.trim().is_empty()).then_some(repository);
        self
    }

    /// Append registries from a comma-separated list.
    #[must_use]
    pub fn with_allowed_registries(mut self, list: &str) -> Self {
        self.allowed_registries.extend(parse_registry_list(list));
        self
    }

    /// Every registry prefix consulted by [`Self::verify_registry`].
    #[must_use]
    pub fn registry_prefixes(&self) -> Vec<String> {
        self.default_registries
            .iter()
            .chain(self.custom_image_repository.iter())
            .chain(self.allowed_registries.iter())
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect()
    }

    /// Check that an image reference lives under a trusted registry path.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UntrustedRegistry`] when no prefix covers it.
    pub fn verify_registry(&self, image: &str) -> PluginResult<()> {
        let repository = repository_of(image);
        let prefixes = self.registry_prefixes();

        if let Some(prefix) = prefixes.iter().find(|p| covers(p, repository)) {
            debug!(image, prefix = %prefix, "Image registry is trusted");
            return Ok(());
        }

        Err(PluginError::UntrustedRegistry {
            image: image.to_string(),
            allowed: prefixes,
        })
    }

    /// Check that a direct download URI starts with a trusted location.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UntrustedLocation`] listing the allowed prefixes.
    pub fn verify_artifact_location(&self, uri: &str) -> PluginResult<()> {
        if self
            .trusted_locations
            .iter()
            .any(|prefix| uri.starts_with(prefix.as_str()))
        {
            return Ok(());
        }
        Err(PluginError::UntrustedLocation {
            uri: uri.to_string(),
            allowed: self.trusted_locations.clone(),
        })
    }

    /// Run the checks that apply before an artifact is fetched.
    ///
    /// Local paths come from sources the user pointed at explicitly and are
    /// only subject to digest verification.
    ///
    /// # Errors
    ///
    /// Returns the failing check's error.
    pub fn verify_pre_download(&self, location: &ArtifactLocation) -> PluginResult<()> {
        match location {
            ArtifactLocation::Image(image) => self.verify_registry(image),
            ArtifactLocation::Uri(uri) => self.verify_artifact_location(uri),
            ArtifactLocation::Path(_) => Ok(()),
        }
    }
}
