//! Mock collaborators for the plugin manager.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use plinth_plugins::inspect::parse_info;
use plinth_plugins::{
    ArtifactLocation, PluginError, PluginInfo, PluginInspector, PluginResult, Transport,
};

/// Transport serving canned bytes per location.
///
/// Unknown locations fail with [`PluginError::Transport`]. Every request is
/// recorded, served or not.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    artifacts: Arc<Mutex<HashMap<ArtifactLocation, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<ArtifactLocation>>>,
}

impl MockTransport {
    /// Create a transport with no artifacts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for `location`.
    #[must_use]
    pub fn with_artifact(self, location: ArtifactLocation, bytes: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut guard) = self.artifacts.lock() {
            guard.insert(location, bytes.into());
        }
        self
    }

    /// Every location requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ArtifactLocation> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, location: &ArtifactLocation) -> PluginResult<Vec<u8>> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(location.clone());
        }
        self.artifacts
            .lock()
            .ok()
            .and_then(|a| a.get(location).cloned())
            .ok_or_else(|| PluginError::Transport {
                location: location.to_string(),
                message: "not found".to_string(),
            })
    }
}

/// Transport that fails every request with the same message.
#[derive(Debug, Clone)]
pub struct FailingTransport {
    message: String,
}

impl FailingTransport {
    /// Create a transport failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn fetch(&self, location: &ArtifactLocation) -> PluginResult<Vec<u8>> {
        Err(PluginError::Transport {
            location: location.to_string(),
            message: self.message.clone(),
        })
    }
}

/// Inspector that reports the same info for every binary.
#[derive(Debug, Clone, Default)]
pub struct StaticInspector {
    info: PluginInfo,
}

impl StaticInspector {
    /// Report `info` for every binary.
    #[must_use]
    pub fn new(info: PluginInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl PluginInspector for StaticInspector {
    async fn inspect(&self, _path: &Path) -> PluginResult<PluginInfo> {
        Ok(self.info.clone())
    }
}

/// Inspector that parses the binary itself as the `info` JSON document.
///
/// Pairs with the fixture binaries, which contain exactly that document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileInspector;

#[async_trait]
impl PluginInspector for JsonFileInspector {
    async fn inspect(&self, path: &Path) -> PluginResult<PluginInfo> {
        let bytes = std::fs::read(path).map_err(|e| PluginError::Inspect {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        parse_info(&bytes).map_err(|message| PluginError::Inspect {
            path: path.to_path_buf(),
            message,
        })
    }
}
