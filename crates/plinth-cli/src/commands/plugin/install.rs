use std::path::Path;

use plinth_plugins::{PluginManager, Target};

use crate::theme::Theme;

/// Install one plugin, or every plugin of a local directory when the name is
/// `all`.
pub(crate) async fn install_plugin(
    manager: &PluginManager,
    name: &str,
    version: Option<&str>,
    target: Option<Target>,
    local: Option<&Path>,
) -> anyhow::Result<()> {
    let target = target.unwrap_or_default();

    match local {
        Some(path) => {
            let install_all = name == "all";
            manager
                .install_plugins_from_local_source(name, version, target, path, install_all)
                .await?;
            if install_all {
                println!(
                    "{}",
                    Theme::success(&format!("Installed all plugins from {}", path.display()))
                );
                return Ok(());
            }
        },
        None => manager.install_plugin(name, version, target).await?,
    }

    let record = manager.describe_plugin(name, target).await?;
    println!(
        "{}",
        Theme::success(&format!(
            "Installed plugin '{}' {} ({})",
            record.name,
            record.version,
            Theme::target(record.target)
        ))
    );
    println!("  {}", Theme::kv("Path", &record.install_path.display().to_string()));
    Ok(())
}
