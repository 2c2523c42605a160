//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they are only applied to fields
//! the user's config file did not set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: ValueKind,
}

#[derive(Clone, Copy)]
enum ValueKind {
    String,
    Integer,
    /// Comma-separated list.
    List,
}

/// Every supported `PLINTH_*` env var.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PLINTH_ALLOWED_REGISTRIES",
        field_path: "trust.allowed_registries",
        kind: ValueKind::List,
    },
    EnvMapping {
        var_name: "PLINTH_CUSTOM_IMAGE_REPOSITORY",
        field_path: "trust.custom_image_repository",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "PLINTH_LOG_LEVEL",
        field_path: "logging.level",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "PLINTH_MAX_CONCURRENT_INSTALLS",
        field_path: "install.max_concurrent_installs",
        kind: ValueKind::Integer,
    },
];

/// Apply env var fallbacks to `merged` for every field `user` does not set.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] when a numeric variable does not parse.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    user: Option<&toml::Value>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if user.is_some_and(|u| lookup(u, mapping.field_path).is_some()) {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        let value = coerce(mapping, raw)?;
        set_field(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    match mapping.kind {
        ValueKind::String => Ok(toml::Value::String(raw.trim().to_owned())),
        ValueKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer: {e}"),
            }),
        ValueKind::List => Ok(toml::Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_owned()))
                .collect(),
        )),
    }
}

/// Look up a dotted field path.
pub(crate) fn lookup<'a>(root: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
    path.split('.')
        .try_fold(root, |current, segment| current.as_table()?.get(segment))
}

/// Set a dotted field path, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_apply_env_fallbacks() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let env = make_env(&[
            ("PLINTH_LOG_LEVEL", "debug"),
            ("PLINTH_ALLOWED_REGISTRIES", "mirror.example.com/plugins, other.io"),
            ("PLINTH_MAX_CONCURRENT_INSTALLS", "8"),
        ]);

        let count = apply_env_fallbacks(&mut merged, None, &env).unwrap();

        assert_eq!(count, 3);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "debug");
        assert_eq!(merged["install"]["max_concurrent_installs"].as_integer(), Some(8));
        let registries = merged["trust"]["allowed_registries"].as_array().unwrap();
        assert_eq!(registries.len(), 2);
        assert_eq!(registries[1].as_str(), Some("other.io"));
    }

    #[test]
    fn test_env_fallback_skips_fields_set_by_file() {
        let user: toml::Value = toml::from_str("[logging]\nlevel = \"error\"").unwrap();
        let mut merged = user.clone();
        let env = make_env(&[("PLINTH_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, Some(&user), &env).unwrap();

        assert_eq!(count, 0);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "error");
    }

    #[test]
    fn test_empty_env_var_is_ignored() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let env = make_env(&[("PLINTH_CUSTOM_IMAGE_REPOSITORY", "  ")]);
        assert_eq!(apply_env_fallbacks(&mut merged, None, &env).unwrap(), 0);
    }

    #[test]
    fn test_invalid_integer_is_an_error() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let env = make_env(&[("PLINTH_MAX_CONCURRENT_INSTALLS", "many")]);
        let err = apply_env_fallbacks(&mut merged, None, &env).unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { .. }));
    }

    #[test]
    fn test_lookup() {
        let val: toml::Value = toml::from_str("[a.b]\nc = 1").unwrap();
        assert_eq!(lookup(&val, "a.b.c").and_then(toml::Value::as_integer), Some(1));
        assert!(lookup(&val, "a.x").is_none());
        assert!(lookup(&val, "a.b.c.d").is_none());
    }
}
