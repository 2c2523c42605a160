//! On-disk plugin sources and catalog records for tests.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use plinth_plugins::discovery::manifest::{
    LEGACY_MANIFEST_FILE, PLUGIN_MANIFEST_FILE, artifact_path, legacy_artifact_path,
};
use plinth_plugins::trust::sha256_hex;
use plinth_plugins::{DiscoverySource, InstalledPlugin, Platform, Target};

/// Command group reported by every fixture binary.
pub const TEST_PLUGIN_GROUP: &str = "System";

/// The bytes of a fixture plugin binary: the JSON its `info` command prints.
#[must_use]
pub fn plugin_binary(name: &str, target: Target, version: &str) -> Vec<u8> {
    serde_json::json!({
        "name": name,
        "description": format!("{name} functionality"),
        "target": target.as_str(),
        "version": version,
        "buildSHA": "c2dbd15",
        "group": TEST_PLUGIN_GROUP,
    })
    .to_string()
    .into_bytes()
}

/// An installed record with every required field set.
#[must_use]
pub fn test_record(name: &str, target: Target, version: &str) -> InstalledPlugin {
    InstalledPlugin::new(name, target, version).with_group(TEST_PLUGIN_GROUP)
}

fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create {}: {e}", parent.display()));
    }
    std::fs::write(path, contents).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

fn target_dir(target: Target) -> &'static str {
    if target.is_concrete() {
        target.as_str()
    } else {
        "unknown"
    }
}

/// A temporary directory of plugin descriptors with their binaries.
///
/// Every artifact is a relative `path` with its SHA-256 digest, built for
/// the platform given at construction.
#[derive(Debug)]
pub struct SourceDir {
    dir: tempfile::TempDir,
    platform: Platform,
}

impl SourceDir {
    /// Create an empty source directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new(platform: &Platform) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}")),
            platform: platform.clone(),
        }
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a descriptor offering `versions` plus a binary for each.
    ///
    /// # Panics
    ///
    /// Panics on I/O errors.
    pub fn add_plugin(
        &self,
        name: &str,
        target: Target,
        recommended: &str,
        versions: &[&str],
    ) -> &Self {
        let mut yaml = format!("name: {name}\ndescription: {name} functionality\n");
        if target.is_concrete() {
            let _ = writeln!(yaml, "target: {}", target.as_str());
        }
        let _ = writeln!(yaml, "recommendedVersion: {recommended}\nartifacts:");

        for version in versions {
            let relative = PathBuf::from("artifacts")
                .join(name)
                .join(target_dir(target))
                .join(version)
                .join(self.platform.binary_name(name));
            let bytes = plugin_binary(name, target, version);
            write_file(&self.path().join(&relative), &bytes);

            let _ = write!(
                yaml,
                "  {version}:\n    - os: {}\n      arch: {}\n      path: {}\n      digest: {}\n",
                self.platform.os,
                self.platform.arch,
                relative.display(),
                sha256_hex(&bytes),
            );
        }

        let file = format!("{name}-{}.yaml", target_dir(target));
        write_file(&self.path().join(file), yaml.as_bytes());
        self
    }

    /// Replace a binary after its descriptor was written, so the advertised
    /// digest no longer matches.
    ///
    /// # Panics
    ///
    /// Panics on I/O errors.
    pub fn corrupt_binary(&self, name: &str, target: Target, version: &str) {
        let path = self
            .path()
            .join("artifacts")
            .join(name)
            .join(target_dir(target))
            .join(version)
            .join(self.platform.binary_name(name));
        write_file(&path, b"corrupted");
    }

    /// A local discovery source over this directory.
    #[must_use]
    pub fn source(&self, name: &str) -> DiscoverySource {
        DiscoverySource::LocalDir {
            name: name.to_string(),
            path: self.path().to_path_buf(),
        }
    }
}

/// A temporary directory described by a manifest file.
#[derive(Debug)]
pub struct ManifestDir {
    dir: tempfile::TempDir,
}

impl ManifestDir {
    /// Write a legacy `manifest.yaml` with `(name, description, versions)`
    /// entries and a binary per version.
    ///
    /// # Panics
    ///
    /// Panics on I/O errors.
    #[must_use]
    pub fn legacy(platform: &Platform, plugins: &[(&str, &str, &[&str])]) -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut yaml = String::from("plugins:\n");
        for (name, description, versions) in plugins {
            let _ = writeln!(
                yaml,
                "  - name: {name}\n    description: {description}\n    versions: [{}]",
                versions.join(", ")
            );
            for version in *versions {
                let path = legacy_artifact_path(dir.path(), platform, name, version);
                write_file(&path, &plugin_binary(name, Target::Unknown, version));
            }
        }
        write_file(&dir.path().join(LEGACY_MANIFEST_FILE), yaml.as_bytes());
        Self { dir }
    }

    /// Write a `plugin_manifest.yaml` with `(name, description, target, version)`
    /// entries and a binary per entry. An empty target is omitted.
    ///
    /// # Panics
    ///
    /// Panics on I/O errors or invalid targets.
    #[must_use]
    pub fn current(platform: &Platform, plugins: &[(&str, &str, &str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut yaml = String::from("plugins:\n");
        for (name, description, target, version) in plugins {
            let _ = writeln!(yaml, "  - name: {name}\n    description: {description}");
            if !target.is_empty() {
                let _ = writeln!(yaml, "    target: {target}");
            }
            let _ = writeln!(yaml, "    version: {version}");

            let parsed = match Target::parse(target).unwrap_or_else(|e| panic!("{e}")) {
                Target::Unknown => Target::Global,
                concrete => concrete,
            };
            let path = artifact_path(dir.path(), platform, parsed, name, version);
            write_file(&path, &plugin_binary(name, parsed, version));
        }
        write_file(&dir.path().join(PLUGIN_MANIFEST_FILE), yaml.as_bytes());
        Self { dir }
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
