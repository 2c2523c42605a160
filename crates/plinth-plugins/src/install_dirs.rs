//! On-disk layout of installed plugin binaries.
//!
//! Each install writes a fresh file at
//! `<plugin_root>/<name>/<version>_<digest prefix>_<target>`, so a re-install
//! of a different build never overwrites a binary another process may be
//! executing.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::{PluginError, PluginResult};
use crate::plugin::Target;

/// Number of digest characters kept in the binary file name.
const DIGEST_PREFIX_LEN: usize = 12;

/// Whether `value` is usable as exactly one path component: non-empty, no
/// separators, and not `.` or `..`.
#[must_use]
pub fn is_path_segment(value: &str) -> bool {
    if value.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Return the path a plugin binary is installed to.
///
/// Does **not** create anything. Use [`write_plugin_binary`] for that.
///
/// # Errors
///
/// Returns [`PluginError::UnsafeInstallPath`] when `name` or `version` is not
/// a single path component, or the result would leave `plugin_root`.
pub fn plugin_binary_path(
    plugin_root: &Path,
    name: &str,
    version: &str,
    digest: &str,
    target: Target,
) -> PluginResult<PathBuf> {
    let unsafe_path = || PluginError::UnsafeInstallPath {
        name: name.to_string(),
        version: version.to_string(),
    };
    if !is_path_segment(name) || !is_path_segment(version) {
        return Err(unsafe_path());
    }

    let prefix = digest.get(..DIGEST_PREFIX_LEN).unwrap_or(digest);
    let target = if target.is_concrete() {
        target.as_str()
    } else {
        "unknown"
    };
    let path = plugin_root
        .join(name)
        .join(format!("{version}_{prefix}_{target}"));

    let depth = path
        .strip_prefix(plugin_root)
        .map_err(|_| unsafe_path())?
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    if depth != 2 {
        return Err(unsafe_path());
    }
    Ok(path)
}

/// Write a binary atomically and mark it executable.
///
/// # Errors
///
/// Returns an I/O error if the directory, temp file or rename fails.
pub fn write_plugin_binary(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o755))?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove an installed binary. A binary that is already gone is not an error.
///
/// # Errors
///
/// Returns any other I/O error.
pub fn remove_plugin_binary(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
