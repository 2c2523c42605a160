//! Plugin lifecycle management for the Plinth CLI.
//!
//! Turns the output of several possibly-overlapping discovery sources into a
//! single, conflict-free view of which plugins exist and whether they are
//! installed, and installs artifacts only after they pass provenance and
//! integrity checks:
//!
//! - [`DiscoverySource`] / [`DiscoveryPlan`]: where plugin metadata comes from
//! - [`resolve`]: deduplication, status resolution and legacy reconciliation
//! - [`TrustPolicy`]: registry allow-list, artifact location allow-list, digests
//! - [`Catalog`]: the persisted record of installed plugins
//! - [`Transport`] / [`PluginInspector`]: artifact retrieval and binary inspection
//! - [`PluginManager`]: discover, install, describe, delete and sync
//!
//! # Identity
//!
//! A plugin is identified by `(name, target)`. The [`Target::Unknown`] target
//! is a placeholder for plugins published before targets existed; it is
//! suppressed whenever the same name is also available for a concrete target.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod catalog;
pub mod discovery;
pub mod error;
pub mod inspect;
pub mod install_dirs;
pub mod manager;
pub mod platform;
pub mod plugin;
pub mod resolve;
pub mod transport;
pub mod trust;

pub use catalog::{Catalog, FileCatalog, MemoryCatalog};
pub use discovery::{
    ContextDiscovery, DiscoveryFailurePolicy, DiscoveryPlan, DiscoverySource, discover_all,
};
pub use error::{PluginError, PluginResult};
pub use inspect::{ExecInspector, PluginInfo, PluginInspector};
pub use manager::{DeletePluginOptions, ManagerConfig, PluginManager, validate_plugin};
pub use platform::Platform;
pub use plugin::{
    Artifact, ArtifactLocation, DiscoveredPlugin, DiscoveryType, Distribution, InstalledPlugin,
    PluginStatus, Scope, Target,
};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{FileTransport, Transport};
pub use trust::TrustPolicy;
