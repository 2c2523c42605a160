//! Plugin lifecycle commands: list, install, describe, delete and sync.

pub(crate) mod delete;
pub(crate) mod describe;
pub(crate) mod install;
pub(crate) mod list;
pub(crate) mod sync;

pub(crate) use delete::delete_plugin;
pub(crate) use describe::describe_plugin;
pub(crate) use install::install_plugin;
pub(crate) use list::list_plugins;
pub(crate) use sync::sync_plugins;
