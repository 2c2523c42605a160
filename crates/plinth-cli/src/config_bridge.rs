//! Bridge from `plinth_config::Config` to plugin-manager and telemetry types.

use std::sync::Arc;

use anyhow::{Context, bail};
use plinth_config::{
    Config, ContextSection, FailurePolicyConfig, ResolvedConfig, SourceKind, SourceSection,
};
use plinth_plugins::{
    ContextDiscovery, DiscoveryFailurePolicy, DiscoveryPlan, DiscoverySource, ExecInspector,
    FileCatalog, HttpTransport, ManagerConfig, PluginManager, Target, TrustPolicy,
};
use plinth_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// Logging settings from the `[logging]` section.
///
/// # Errors
///
/// Returns an error for a format, target or rotation the telemetry crate does
/// not know.
pub(crate) fn to_log_config(resolved: &ResolvedConfig) -> anyhow::Result<LogConfig> {
    let logging = &resolved.config.logging;
    let format = logging
        .format
        .parse::<LogFormat>()
        .context("invalid logging.format")?;

    let mut log_config = LogConfig::new(&logging.level).with_format(format);
    log_config = match logging.target.as_str() {
        "stderr" => log_config.with_target(LogTarget::Stderr),
        "stdout" => log_config.with_target(LogTarget::Stdout),
        "file" => {
            let rotation = logging
                .rotation
                .parse::<FileRotation>()
                .context("invalid logging.rotation")?;
            log_config.with_file_logging(resolved.log_dir(), rotation)
        },
        other => bail!("invalid logging.target '{other}'"),
    };
    for directive in &logging.directives {
        log_config = log_config.with_directive(directive);
    }
    Ok(log_config)
}

/// Registry allow-list from the `[trust]` section.
pub(crate) fn to_trust_policy(config: &Config) -> TrustPolicy {
    let mut trust = TrustPolicy::default();
    if let Some(repository) = &config.trust.custom_image_repository {
        trust = trust.with_custom_image_repository(repository);
    }
    if !config.trust.allowed_registries.is_empty() {
        trust = trust.with_allowed_registries(&config.trust.allowed_registries.join(","));
    }
    trust
}

fn to_source(section: &SourceSection) -> anyhow::Result<DiscoverySource> {
    let name = section.name.clone();
    Ok(match (section.kind, &section.image, &section.path) {
        (SourceKind::Oci, Some(image), _) => DiscoverySource::Oci {
            name,
            image: image.clone(),
        },
        (SourceKind::Local, _, Some(path)) => DiscoverySource::LocalDir {
            name,
            path: path.clone(),
        },
        (SourceKind::Manifest, _, Some(path)) => DiscoverySource::LegacyManifest {
            name,
            path: path.clone(),
        },
        _ => bail!("discovery source '{name}' is incomplete"),
    })
}

fn to_context(section: &ContextSection) -> anyhow::Result<ContextDiscovery> {
    let target = Target::parse(&section.target)
        .with_context(|| format!("context '{}'", section.name))?;
    Ok(ContextDiscovery {
        name: section.name.clone(),
        target,
        sources: section
            .sources
            .iter()
            .map(to_source)
            .collect::<anyhow::Result<_>>()?,
    })
}

/// Discovery sources from the `[discovery]` section. Inactive contexts are
/// left out.
pub(crate) fn to_discovery_plan(config: &Config) -> anyhow::Result<DiscoveryPlan> {
    Ok(DiscoveryPlan {
        standalone: config
            .discovery
            .sources
            .iter()
            .map(to_source)
            .collect::<anyhow::Result<_>>()?,
        contexts: config
            .discovery
            .contexts
            .iter()
            .filter(|c| c.active)
            .map(to_context)
            .collect::<anyhow::Result<_>>()?,
    })
}

/// Manager settings from the `[install]` and `[discovery]` sections.
pub(crate) fn to_manager_config(resolved: &ResolvedConfig) -> ManagerConfig {
    let config = &resolved.config;
    let policy = match config.discovery.failure_policy {
        FailurePolicyConfig::FailFast => DiscoveryFailurePolicy::FailFast,
        FailurePolicyConfig::Skip => DiscoveryFailurePolicy::SkipAndContinue,
    };
    ManagerConfig::new(resolved.plugin_root())
        .with_max_concurrent_installs(config.install.max_concurrent_installs)
        .with_failure_policy(policy)
}

/// Build the production manager: file catalog, HTTP transport and
/// exec-based inspection.
pub(crate) fn build_manager(resolved: &ResolvedConfig) -> anyhow::Result<PluginManager> {
    let transport = HttpTransport::new().context("failed to build HTTP client")?;
    Ok(PluginManager::new(
        to_manager_config(resolved),
        Arc::new(FileCatalog::new(resolved.catalog_path())),
        Arc::new(transport),
        Arc::new(ExecInspector::new()),
    )
    .with_trust_policy(to_trust_policy(&resolved.config))
    .with_discovery_plan(to_discovery_plan(&resolved.config)?))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config_with_sources() -> Config {
        toml::from_str(
            r#"
            [discovery]
            failure_policy = "fail-fast"

            [[discovery.sources]]
            name = "default"
            type = "oci"
            image = "projects.registry.plinth.dev/plinth-cli/plugins/inventory:latest"

            [[discovery.contexts]]
            name = "mgmt"
            target = "k8s"

            [[discovery.contexts.sources]]
            name = "mgmt-local"
            type = "manifest"
            path = "/opt/plugins/mgmt"

            [[discovery.contexts]]
            name = "old"
            target = "tmc"
            active = false
        "#,
        )
        .unwrap()
    }

    #[test]
    fn test_discovery_plan_skips_inactive_contexts() {
        let plan = to_discovery_plan(&config_with_sources()).unwrap();

        assert_eq!(plan.standalone.len(), 1);
        assert!(matches!(plan.standalone[0], DiscoverySource::Oci { .. }));
        assert_eq!(plan.contexts.len(), 1);
        assert_eq!(plan.contexts[0].target, Target::Kubernetes);
        assert_eq!(
            plan.contexts[0].sources[0],
            DiscoverySource::LegacyManifest {
                name: "mgmt-local".into(),
                path: PathBuf::from("/opt/plugins/mgmt"),
            }
        );
    }

    #[test]
    fn test_trust_policy_includes_configured_registries() {
        let mut config = Config::default();
        config.trust.allowed_registries = vec!["mirror.example.com/plugins".into()];
        config.trust.custom_image_repository = Some("custom.example.com/plinth".into());

        let trust = to_trust_policy(&config);
        trust
            .verify_registry("mirror.example.com/plugins/login:v1")
            .unwrap();
        trust
            .verify_registry("custom.example.com/plinth/login:v1")
            .unwrap();
        assert!(trust.verify_registry("evil.example.com/login:v1").is_err());
    }

    fn resolved(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            config,
            home: PathBuf::from("/home/user/.plinth"),
            loaded_files: Vec::new(),
        }
    }

    #[test]
    fn test_log_config_from_logging_section() {
        let mut config = Config::default();
        config.logging.format = "json".into();
        config.logging.directives = vec!["plinth_plugins=debug".into()];

        let log_config = to_log_config(&resolved(config)).unwrap();
        assert_eq!(log_config.level, "warn");
        assert_eq!(log_config.format, LogFormat::Json);
        assert_eq!(log_config.target, LogTarget::Stderr);
        assert_eq!(log_config.directives, vec!["plinth_plugins=debug"]);
    }

    #[test]
    fn test_file_log_target_uses_log_dir() {
        let mut config = Config::default();
        config.logging.target = "file".into();
        config.logging.rotation = "hourly".into();

        let log_config = to_log_config(&resolved(config)).unwrap();
        assert_eq!(
            log_config.target,
            LogTarget::File(PathBuf::from("/home/user/.plinth/logs"))
        );
        assert_eq!(log_config.file.rotation, FileRotation::Hourly);
        assert!(!log_config.ansi);
    }

    #[test]
    fn test_unknown_log_format_is_an_error() {
        let mut config = Config::default();
        config.logging.format = "xml".into();

        assert!(plinth_config::validate::validate(&config).is_err());
        let err = to_log_config(&resolved(config)).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_manager_config_paths() {
        let manager_config = to_manager_config(&resolved(config_with_sources()));
        assert_eq!(
            manager_config.plugin_root,
            PathBuf::from("/home/user/.plinth/plugins")
        );
        assert_eq!(manager_config.failure_policy, DiscoveryFailurePolicy::FailFast);
        assert_eq!(manager_config.max_concurrent_installs, 4);
    }
}
