#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Configuration for the Plinth CLI.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plinth_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("Installing to {}", resolved.plugin_root().display());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **User** (`<home>/config.toml`)
//! 2. **Environment variables** (`PLINTH_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! `<home>` is `PLINTH_HOME` when set, else the platform data directory.
//!
//! # Design
//!
//! This crate has **no dependencies on other internal plinth crates**.
//! Conversion into plugin-manager types happens in the CLI.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAME, ResolvedConfig};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// `home_override` replaces `PLINTH_HOME` and the platform default.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file is malformed or the final
    /// configuration fails validation.
    pub fn load(home_override: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(home_override)
    }
}
