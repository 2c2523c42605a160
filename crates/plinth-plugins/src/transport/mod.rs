//! Artifact retrieval.
//!
//! The core never talks to the network directly; it asks a [`Transport`] for
//! the bytes behind an [`ArtifactLocation`]. Retry policy belongs to the
//! transport. Any error it returns is terminal for the install that asked.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use async_trait::async_trait;

use crate::error::{PluginError, PluginResult};
use crate::plugin::ArtifactLocation;

/// Fetches artifact bytes for a resolved location.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Retrieve the full contents of the artifact.
    async fn fetch(&self, location: &ArtifactLocation) -> PluginResult<Vec<u8>>;
}

/// Transport that can only read local files.
///
/// Sufficient for local discovery sources; image and URI locations are
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    async fn fetch(&self, location: &ArtifactLocation) -> PluginResult<Vec<u8>> {
        match location {
            ArtifactLocation::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|e| PluginError::Transport {
                        location: location.to_string(),
                        message: e.to_string(),
                    })
            },
            ArtifactLocation::Image(_) | ArtifactLocation::Uri(_) => Err(PluginError::Transport {
                location: location.to_string(),
                message: "remote artifacts require the `http` feature".to_string(),
            }),
        }
    }
}
