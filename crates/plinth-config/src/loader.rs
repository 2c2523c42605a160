//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge `<home>/config.toml` (user)
//! 3. Apply env var fallbacks for fields the user file did not set
//! 4. Deserialize merged tree → `Config`
//! 5. Validate
//!
//! `<home>` is the explicit override, else `PLINTH_HOME`, else the platform
//! data directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Name of the user config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration with the locations it was resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// The Plinth home directory.
    pub home: PathBuf,
    /// Config files that contributed, in load order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Directory plugin binaries are installed to.
    #[must_use]
    pub fn plugin_root(&self) -> PathBuf {
        self.resolve(self.config.install.plugin_root.as_deref(), "plugins")
    }

    /// Path of the installed-plugin catalog.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(self.config.install.catalog_path.as_deref(), "catalog.toml")
    }

    /// Directory for log files. Defaults to `<home>/logs`.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(self.config.logging.directory.as_deref(), "logs")
    }

    fn resolve(&self, configured: Option<&Path>, default: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.home.join(path),
            None => self.home.join(default),
        }
    }
}

/// Load the configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`] if no home directory can be determined, the
/// user file is malformed, an env var is invalid, or the merged
/// configuration fails validation.
pub fn load(home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(home_override, &collect_env_vars())
}

/// [`load`] against an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let home = match home_override {
        Some(home) => home.to_path_buf(),
        None => home_directory(env_vars)?,
    };

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    let user_path = home.join(CONFIG_FILE_NAME);
    let user = try_load_file(&user_path)?;
    if let Some(overlay) = &user {
        deep_merge(&mut merged, overlay);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    let env_count = apply_env_fallbacks(&mut merged, user.as_ref(), env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        home,
        loaded_files,
    })
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; anything else
/// (arrays included) is replaced.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn home_directory<S: ::std::hash::BuildHasher>(
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<PathBuf> {
    if let Some(home) = env_vars.get("PLINTH_HOME").filter(|h| !h.trim().is_empty()) {
        return Ok(PathBuf::from(home));
    }
    directories::ProjectDirs::from("dev", "plinth", "plinth")
        .map(|d| d.data_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_without_user_file() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_with_env(Some(home.path()), &env(&[])).unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.plugin_root(), home.path().join("plugins"));
        assert_eq!(resolved.catalog_path(), home.path().join("catalog.toml"));
        assert_eq!(resolved.log_dir(), home.path().join("logs"));
    }

    #[test]
    fn test_file_logging_directory_resolves_against_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join(CONFIG_FILE_NAME),
            "[logging]\ntarget = \"file\"\ndirectory = \"var/log\"\nrotation = \"hourly\"\n",
        )
        .unwrap();

        let resolved = load_with_env(Some(home.path()), &env(&[])).unwrap();
        assert_eq!(resolved.config.logging.target, "file");
        assert_eq!(resolved.config.logging.rotation, "hourly");
        assert_eq!(resolved.log_dir(), home.path().join("var/log"));
    }

    #[test]
    fn test_user_file_overrides_defaults_and_env() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join(CONFIG_FILE_NAME),
            r#"
            [logging]
            level = "info"

            [install]
            plugin_root = "bin"
            catalog_path = "/var/lib/plinth/catalog.toml"
        "#,
        )
        .unwrap();

        let resolved = load_with_env(
            Some(home.path()),
            &env(&[
                ("PLINTH_LOG_LEVEL", "trace"),
                ("PLINTH_ALLOWED_REGISTRIES", "mirror.example.com/plugins"),
            ]),
        )
        .unwrap();

        let config = &resolved.config;
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "compact");
        assert_eq!(config.trust.allowed_registries, vec!["mirror.example.com/plugins"]);
        assert_eq!(resolved.plugin_root(), home.path().join("bin"));
        assert_eq!(
            resolved.catalog_path(),
            PathBuf::from("/var/lib/plinth/catalog.toml")
        );
        assert_eq!(resolved.loaded_files.len(), 1);
    }

    #[test]
    fn test_plinth_home_env() {
        let home = tempfile::tempdir().unwrap();
        let vars = env(&[("PLINTH_HOME", home.path().to_str().unwrap())]);
        let resolved = load_with_env(None, &vars).unwrap();
        assert_eq!(resolved.home, home.path());
    }

    #[test]
    fn test_invalid_user_file_is_rejected() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join(CONFIG_FILE_NAME),
            "[install]\nmax_concurrent_installs = 0\n",
        )
        .unwrap();

        let err = load_with_env(Some(home.path()), &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_malformed_user_file() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(CONFIG_FILE_NAME), "[install\n").unwrap();

        let err = load_with_env(Some(home.path()), &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut base: toml::Value = toml::from_str("[trust]\nallowed_registries = [\"a\"]").unwrap();
        let overlay: toml::Value = toml::from_str("[trust]\nallowed_registries = [\"b\"]").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["trust"]["allowed_registries"].as_array().unwrap().len(), 1);
        assert_eq!(base["trust"]["allowed_registries"][0].as_str(), Some("b"));
    }
}
