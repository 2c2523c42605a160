//! Plinth Test - Shared test utilities for the plugin manager.
//!
//! Fixtures build throwaway plugin source directories on disk; mocks stand
//! in for the transport and inspector collaborators.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! plinth-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use plinth_test::{JsonFileInspector, SourceDir};
//! use plinth_plugins::{Platform, Target};
//!
//! let platform = Platform::new("linux", "amd64");
//! let source = SourceDir::new(&platform);
//! source.add_plugin("login", Target::Unknown, "v0.2.0", &["v0.2.0"]);
//! ```
//!
//! Plugin "binaries" written by the fixtures contain the JSON their `info`
//! command would print, so [`JsonFileInspector`] can describe them without
//! executing anything.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
