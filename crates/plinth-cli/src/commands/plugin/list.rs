use std::path::Path;

use plinth_plugins::{DiscoveredPlugin, PluginManager};

use crate::theme::Theme;

const STATUS_WIDTH: usize = 16;

pub(crate) async fn list_plugins(
    manager: &PluginManager,
    local: Option<&Path>,
) -> anyhow::Result<()> {
    let plugins = match local {
        Some(path) => manager.available_plugins_from_local_source(path).await?,
        None => manager.available_plugins().await?,
    };

    if plugins.is_empty() {
        println!("{}", Theme::info("No plugins available"));
        return Ok(());
    }

    let title = match local {
        Some(path) => format!("Plugins in {}", path.display()),
        None => "Available Plugins".to_string(),
    };
    println!("{}", Theme::header(&title));
    println!(
        "  {:<24} {:<16} {:<10} {:<STATUS_WIDTH$} SOURCE",
        "NAME", "TARGET", "VERSION", "STATUS"
    );
    println!("{}", Theme::separator());
    for plugin in &plugins {
        println!("  {}", row(plugin));
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} plugin(s)", plugins.len()))
    );
    Ok(())
}

fn row(plugin: &DiscoveredPlugin) -> String {
    let version = plugin
        .installed_version
        .as_deref()
        .unwrap_or(&plugin.recommended_version);
    let source = match &plugin.context_name {
        Some(context) => format!("{} ({context})", plugin.source),
        None => plugin.source.clone(),
    };
    format!(
        "{:<24} {:<16} {:<10} {} {}",
        plugin.name,
        Theme::target(plugin.target),
        version,
        Theme::status(plugin.status, STATUS_WIDTH),
        Theme::dimmed(&source),
    )
}

#[cfg(test)]
mod tests {
    use plinth_plugins::{DiscoveryType, PluginStatus, Scope, Target};

    use super::*;

    #[test]
    fn test_row_prefers_installed_version() {
        colored::control::set_override(false);
        let mut plugin = DiscoveredPlugin::new("cluster", Target::Kubernetes)
            .with_recommended_version("v1.6.0")
            .with_scope(Scope::Context)
            .with_context("mgmt")
            .with_source("mgmt-local", DiscoveryType::Local);
        plugin.installed_version = Some("v1.5.0".into());
        plugin.status = PluginStatus::UpdateAvailable;

        let line = row(&plugin);
        assert!(line.contains("v1.5.0"));
        assert!(!line.contains("v1.6.0"));
        assert!(line.contains("update available"));
        assert!(line.ends_with("mgmt-local (mgmt)"));
    }
}
