//! Post-merge configuration validation.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, SourceKind, SourceSection};

/// Upper bound on `install.max_concurrent_installs`.
const MAX_CONCURRENT_INSTALLS_UPPER_BOUND: usize = 64;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];
const LOG_TARGETS: &[&str] = &["stderr", "stdout", "file"];
const LOG_ROTATIONS: &[&str] = &["daily", "hourly", "never"];
const TARGETS: &[&str] = &["kubernetes", "k8s", "mission-control", "tmc", "global"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_discovery(config)?;
    validate_trust(config)?;
    validate_install(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_discovery(config: &Config) -> ConfigResult<()> {
    let discovery = &config.discovery;
    let mut names = HashSet::new();

    for (i, source) in discovery.sources.iter().enumerate() {
        validate_source(&format!("discovery.sources[{i}]"), source, &mut names)?;
    }

    let mut context_names = HashSet::new();
    for (i, context) in discovery.contexts.iter().enumerate() {
        let field = format!("discovery.contexts[{i}]");
        if context.name.trim().is_empty() {
            return Err(invalid(format!("{field}.name"), "context name cannot be empty"));
        }
        if !context_names.insert(context.name.as_str()) {
            return Err(invalid(
                format!("{field}.name"),
                format!("duplicate context name '{}'", context.name),
            ));
        }
        if !TARGETS.contains(&context.target.to_ascii_lowercase().as_str()) {
            return Err(invalid(
                format!("{field}.target"),
                format!(
                    "unsupported target '{}'; expected one of: {}",
                    context.target,
                    TARGETS.join(", ")
                ),
            ));
        }
        for (j, source) in context.sources.iter().enumerate() {
            validate_source(&format!("{field}.sources[{j}]"), source, &mut names)?;
        }
    }

    Ok(())
}

fn validate_source<'a>(
    field: &str,
    source: &'a SourceSection,
    names: &mut HashSet<&'a str>,
) -> ConfigResult<()> {
    if source.name.trim().is_empty() {
        return Err(invalid(format!("{field}.name"), "source name cannot be empty"));
    }
    if !names.insert(source.name.as_str()) {
        return Err(invalid(
            format!("{field}.name"),
            format!("duplicate source name '{}'", source.name),
        ));
    }

    match (source.kind, &source.image, &source.path) {
        (SourceKind::Oci, Some(image), None) if !image.trim().is_empty() => Ok(()),
        (SourceKind::Oci, ..) => Err(invalid(
            field,
            format!("oci source '{}' must set image and no path", source.name),
        )),
        (SourceKind::Local | SourceKind::Manifest, None, Some(_)) => Ok(()),
        (SourceKind::Local | SourceKind::Manifest, ..) => Err(invalid(
            field,
            format!("local source '{}' must set path and no image", source.name),
        )),
    }
}

fn validate_trust(config: &Config) -> ConfigResult<()> {
    if config
        .trust
        .allowed_registries
        .iter()
        .any(|r| r.trim().is_empty())
    {
        return Err(invalid(
            "trust.allowed_registries",
            "registry entries cannot be empty",
        ));
    }
    Ok(())
}

fn validate_install(config: &Config) -> ConfigResult<()> {
    let max = config.install.max_concurrent_installs;
    if max == 0 || max > MAX_CONCURRENT_INSTALLS_UPPER_BOUND {
        return Err(invalid(
            "install.max_concurrent_installs",
            format!("must be between 1 and {MAX_CONCURRENT_INSTALLS_UPPER_BOUND}, got {max}"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;
    if !LOG_LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: {}",
                logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&logging.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if !LOG_TARGETS.contains(&logging.target.as_str()) {
        return Err(invalid(
            "logging.target",
            format!(
                "unsupported target '{}'; expected one of: {}",
                logging.target,
                LOG_TARGETS.join(", ")
            ),
        ));
    }
    if !LOG_ROTATIONS.contains(&logging.rotation.as_str()) {
        return Err(invalid(
            "logging.rotation",
            format!(
                "unsupported rotation '{}'; expected one of: {}",
                logging.rotation,
                LOG_ROTATIONS.join(", ")
            ),
        ));
    }
    Ok(())
}
