//! Asking an installed plugin binary to describe itself.
//!
//! Every plugin binary answers `<binary> info` with a JSON document naming
//! its command group, version and target. The manager records the group in
//! the catalog, so inspection runs after the binary is written and before
//! the record is saved.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PluginError, PluginResult};

/// Self-description reported by a plugin binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Version compiled into the binary.
    pub version: String,
    /// Command group the plugin belongs to.
    pub group: String,
    /// Target token.
    pub target: String,
    /// Commit the binary was built from.
    #[serde(rename = "buildSHA")]
    pub build_sha: String,
}

/// Obtains [`PluginInfo`] from an installed binary.
#[async_trait]
pub trait PluginInspector: Send + Sync {
    /// Describe the binary at `path`.
    async fn inspect(&self, path: &Path) -> PluginResult<PluginInfo>;
}

/// Default time allowed for `<binary> info` to answer.
const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `<binary> info` and parses its JSON output.
#[derive(Debug, Clone)]
pub struct ExecInspector {
    timeout: Duration,
}

impl Default for ExecInspector {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INFO_TIMEOUT,
        }
    }
}

impl ExecInspector {
    /// Create an inspector with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how long the binary may take to answer.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PluginInspector for ExecInspector {
    async fn inspect(&self, path: &Path) -> PluginResult<PluginInfo> {
        let inspect_err = |message: String| PluginError::Inspect {
            path: path.to_path_buf(),
            message,
        };

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(path)
                .arg("info")
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| inspect_err(format!("no answer within {}s", self.timeout.as_secs())))?
        .map_err(|e| inspect_err(format!("failed to run binary: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(inspect_err(format!(
                "`info` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let info = parse_info(&output.stdout).map_err(inspect_err)?;
        debug!(path = %path.display(), plugin = %info.name, group = %info.group, "Inspected plugin binary");
        Ok(info)
    }
}

/// Parse the JSON document a plugin prints for `info`.
///
/// # Errors
///
/// Returns the parse error message.
pub fn parse_info(bytes: &[u8]) -> Result<PluginInfo, String> {
    serde_json::from_slice(bytes).map_err(|e| format!("invalid plugin info: {e}"))
}
