//! HTTP transport: direct downloads and anonymous OCI registry pulls.
//!
//! An image artifact is a single-layer OCI image whose layer is the plugin
//! binary (or, for discovery sources, the inventory document). The pull is
//! manifest first, then the first layer blob, using the registry v2 API.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use super::Transport;
use crate::error::{PluginError, PluginResult};
use crate::plugin::ArtifactLocation;
use crate::trust::verify_post_download;

/// Default maximum artifact size (200 MB).
const DEFAULT_MAX_SIZE: u64 = 200 * 1024 * 1024;

/// Default HTTP request timeout (120 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (30 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Manifest media types accepted from registries.
const MANIFEST_ACCEPT: &str =
    "application/vnd.oci.image.manifest.v1+json, application/vnd.docker.distribution.manifest.v2+json";

/// Transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    registry_scheme: &'static str,
    max_size: u64,
}

#[derive(Debug, Deserialize)]
struct ImageManifest {
    #[serde(default)]
    layers: Vec<Descriptor>,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    digest: String,
}

/// A parsed `registry/repository[:tag|@digest]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageRef {
    registry: String,
    repository: String,
    reference: String,
}

impl ImageRef {
    fn parse(image: &str) -> Option<Self> {
        let (name, reference) = match image.split_once('@') {
            Some((name, digest)) => (name, digest.to_string()),
            None => match (image.rfind('/'), image.rfind(':')) {
                (Some(slash), Some(colon)) if colon > slash => {
                    (&image[..colon], image[colon..].trim_start_matches(':').to_string())
                },
                _ => (image, "latest".to_string()),
            },
        };
        let (registry, repository) = name.split_once('/')?;
        if registry.is_empty() || repository.is_empty() || reference.is_empty() {
            return None;
        }
        Some(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            reference,
        })
    }
}

impl HttpTransport {
    /// Create a transport with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Transport`] if the HTTP client cannot be built
    /// (e.g. TLS backend unavailable on minimal Linux containers).
    pub fn new() -> PluginResult<Self> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            registry_scheme: "https",
            max_size: DEFAULT_MAX_SIZE,
        })
    }

    /// Override the maximum artifact size in bytes.
    #[must_use]
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Override the HTTP request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Transport`] if the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> PluginResult<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Talk to registries over plain HTTP. Only for local test registries.
    #[must_use]
    pub fn with_plain_http_registries(mut self) -> Self {
        self.registry_scheme = "http";
        self
    }

    async fn pull_image(&self, image: &str) -> PluginResult<Vec<u8>> {
        let location = format!("image:{image}");
        let image_ref = ImageRef::parse(image).ok_or_else(|| PluginError::Transport {
            location: location.clone(),
            message: "malformed image reference".to_string(),
        })?;

        let manifest_url = self.registry_url(
            &image_ref,
            &format!("manifests/{}", image_ref.reference),
            &location,
        )?;
        debug!(url = %manifest_url, "Fetching image manifest");
        let response = self
            .client
            .get(manifest_url)
            .header(reqwest::header::ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await
            .map_err(|e| transport_err(&location, &e))?;
        let response = check_status(response, &location)?;
        let manifest: ImageManifest = response
            .json()
            .await
            .map_err(|e| transport_err(&location, &format!("invalid image manifest: {e}")))?;

        let layer = manifest.layers.first().ok_or_else(|| PluginError::Transport {
            location: location.clone(),
            message: "image has no layers".to_string(),
        })?;

        let blob_url = self.registry_url(&image_ref, &format!("blobs/{}", layer.digest), &location)?;
        debug!(url = %blob_url, digest = %layer.digest, "Fetching image layer");
        let bytes = self.download(blob_url, &location).await?;

        verify_post_download(image, Some(&layer.digest), &bytes)?;
        Ok(bytes)
    }

    fn registry_url(&self, image: &ImageRef, suffix: &str, location: &str) -> PluginResult<url::Url> {
        let raw = format!(
            "{}://{}/v2/{}/{suffix}",
            self.registry_scheme, image.registry, image.repository
        );
        url::Url::parse(&raw).map_err(|e| transport_err(location, &e))
    }

    async fn download(&self, url: url::Url, location: &str) -> PluginResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_err(location, &e))?;
        let response = check_status(response, location)?;

        if let Some(len) = response.content_length()
            && len > self.max_size
        {
            return Err(transport_err(
                location,
                &format!("artifact too large: {len} bytes (limit: {} bytes)", self.max_size),
            ));
        }

        let capacity =
            usize::try_from(response.content_length().unwrap_or(0).min(self.max_size)).unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_err(location, &e))?;
            bytes.extend_from_slice(&chunk);
            let current_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
            if current_size > self.max_size {
                return Err(transport_err(
                    location,
                    &format!("artifact exceeds {} bytes", self.max_size),
                ));
            }
        }

        Ok(bytes)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, location: &ArtifactLocation) -> PluginResult<Vec<u8>> {
        match location {
            ArtifactLocation::Image(image) => self.pull_image(image).await,
            ArtifactLocation::Uri(uri) => {
                let shown = location.to_string();
                let url = url::Url::parse(uri).map_err(|e| transport_err(&shown, &e))?;
                self.download(url, &shown).await
            },
            ArtifactLocation::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| transport_err(&location.to_string(), &e)),
        }
    }
}

fn build_client(timeout: Duration) -> PluginResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(concat!("plinth/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PluginError::Transport {
            location: String::new(),
            message: format!("failed to build HTTP client: {e}"),
        })
}

fn check_status(response: reqwest::Response, location: &str) -> PluginResult<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(transport_err(location, &"registry requires authentication"));
    }
    if !status.is_success() {
        return Err(transport_err(location, &format!("server returned {status}")));
    }
    Ok(response)
}

fn transport_err(location: &str, err: &dyn std::fmt::Display) -> PluginError {
    PluginError::Transport {
        location: location.to_string(),
        message: err.to_string(),
    }
}
