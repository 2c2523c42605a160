use plinth_plugins::{DeletePluginOptions, PluginManager, Target};

use crate::theme::Theme;

pub(crate) async fn delete_plugin(
    manager: &PluginManager,
    name: &str,
    target: Option<Target>,
    force: bool,
) -> anyhow::Result<()> {
    let target = target.unwrap_or_default();
    manager
        .delete_plugin(DeletePluginOptions {
            name: name.to_string(),
            target,
            force_delete: force,
        })
        .await?;

    let label = if target.is_concrete() {
        format!("Deleted plugin '{name}' ({target})")
    } else {
        format!("Deleted plugin '{name}'")
    };
    println!("{}", Theme::success(&label));
    Ok(())
}
