//! Plinth Telemetry - Logging for the Plinth CLI and its libraries.
//!
//! The libraries only emit `tracing` events; this crate decides where they
//! go. Binaries call [`setup_logging`] once at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use plinth_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), plinth_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("plinth_plugins=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
