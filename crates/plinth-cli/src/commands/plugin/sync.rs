use plinth_plugins::{PluginError, PluginManager};

use crate::theme::Theme;

pub(crate) async fn sync_plugins(manager: &PluginManager) -> anyhow::Result<()> {
    match manager.sync_plugins().await {
        Ok(()) => {
            println!("{}", Theme::success("All plugins are up to date"));
            Ok(())
        },
        Err(PluginError::SyncFailed { failures }) => {
            eprintln!("{}", Theme::error("Some plugins could not be installed"));
            for failure in &failures {
                eprintln!("  {}", Theme::dimmed(failure));
            }
            anyhow::bail!("plugin sync failed")
        },
        Err(e) => Err(e.into()),
    }
}
