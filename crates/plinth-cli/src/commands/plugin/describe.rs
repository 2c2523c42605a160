use plinth_plugins::{InstalledPlugin, PluginManager, Target};

use crate::theme::Theme;

pub(crate) async fn describe_plugin(
    manager: &PluginManager,
    name: &str,
    target: Option<Target>,
) -> anyhow::Result<()> {
    let record = manager
        .describe_plugin(name, target.unwrap_or_default())
        .await?;
    for line in describe_lines(&record) {
        println!("{line}");
    }
    Ok(())
}

fn describe_lines(record: &InstalledPlugin) -> Vec<String> {
    let mut lines = vec![
        Theme::header(&format!("Plugin: {}", record.name)),
        Theme::separator(),
        Theme::kv("Target", &Theme::target(record.target)),
        Theme::kv("Version", &record.version),
        Theme::kv("Scope", &record.scope.to_string()),
    ];
    if !record.description.is_empty() {
        lines.push(Theme::kv("Description", &record.description));
    }
    if !record.group.is_empty() {
        lines.push(Theme::kv("Group", &record.group));
    }
    if !record.discovery_source.is_empty() {
        lines.push(Theme::kv("Source", &record.discovery_source));
    }
    lines.push(Theme::kv("Path", &record.install_path.display().to_string()));
    if !record.digest.is_empty() {
        lines.push(Theme::kv("Digest", &Theme::dimmed(&record.digest)));
    }
    lines.push(Theme::kv("Installed", &Theme::timestamp(&record.installed_at)));
    lines
}
