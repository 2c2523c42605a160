//! Reconciliation of installed records that discovery no longer explains.
//!
//! Records written before target-aware identity often carry
//! [`Target::Unknown`](crate::plugin::Target::Unknown) while the same plugin
//! is now published under a concrete target. Two passes keep such plugins
//! visible:
//!
//! - records with no discovered `(name, target)` are surfaced as phantom
//!   entries so an installed plugin never disappears from the listing;
//! - any discovered entry sharing a record's name is marked installed, even
//!   when the targets differ.
//!
//! Both passes only consider standalone records. Context-scoped records
//! belong to a context and are not reconciled here.

use crate::plugin::{DiscoveredPlugin, InstalledPlugin, PluginStatus, Scope};

/// Return phantom entries for standalone records missing from `available`,
/// and mark name-matched entries of `available` as installed.
///
/// Phantoms have `recommended_version` and `installed_version` set to the
/// record's version and status [`PluginStatus::Installed`].
pub fn installed_but_not_discovered(
    available: &mut [DiscoveredPlugin],
    installed: &[InstalledPlugin],
) -> Vec<DiscoveredPlugin> {
    let mut phantoms = Vec::new();

    for record in installed.iter().filter(|r| r.scope == Scope::Standalone) {
        let discovered = available
            .iter()
            .any(|p| p.name == record.name && p.target == record.target);
        if !discovered {
            phantoms.push(phantom(record));
        }

        for plugin in available.iter_mut().filter(|p| p.name == record.name) {
            if plugin.status == PluginStatus::NotInstalled {
                plugin.status = PluginStatus::Installed;
                if plugin.installed_version.is_none() {
                    plugin.installed_version = Some(record.version.clone());
                }
            }
        }
    }

    phantoms
}

fn phantom(record: &InstalledPlugin) -> DiscoveredPlugin {
    let mut plugin = DiscoveredPlugin::new(&record.name, record.target)
        .with_recommended_version(&record.version)
        .with_description(&record.description);
    plugin.source.clone_from(&record.discovery_source);
    plugin.installed_version = Some(record.version.clone());
    plugin.status = PluginStatus::Installed;
    plugin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Target;

    fn available_fake1(status: PluginStatus) -> Vec<DiscoveredPlugin> {
        let mut plugin = DiscoveredPlugin::new("fake1", Target::Unknown)
            .with_recommended_version("v1.0.0")
            .with_source("oci-source", crate::plugin::DiscoveryType::Oci);
        plugin.status = status;
        vec![plugin]
    }

    fn record(name: &str, version: &str) -> InstalledPlugin {
        InstalledPlugin::new(name, Target::Unknown, version).with_discovery_source("local")
    }

    #[test]
    fn undiscovered_record_becomes_phantom() {
        let mut available = available_fake1(PluginStatus::Installed);
        let phantoms = installed_but_not_discovered(&mut available, &[record("fake2", "v2.0.0")]);

        assert_eq!(phantoms.len(), 1);
        assert_eq!(phantoms[0].name, "fake2");
        assert_eq!(phantoms[0].recommended_version, "v2.0.0");
        assert_eq!(phantoms[0].installed_version.as_deref(), Some("v2.0.0"));
        assert_eq!(phantoms[0].status, PluginStatus::Installed);
        assert_eq!(phantoms[0].source, "local");
    }

    #[test]
    fn discovered_record_is_not_a_phantom() {
        let mut available = available_fake1(PluginStatus::Installed);
        let installed = [record("fake2", "v2.0.0"), record("fake1", "v1.0.0")];
        let phantoms = installed_but_not_discovered(&mut available, &installed);

        assert_eq!(phantoms.len(), 1);
        assert_eq!(phantoms[0].name, "fake2");
        assert_eq!(available[0].status, PluginStatus::Installed);
    }

    #[test]
    fn name_match_repairs_not_installed_entry() {
        let mut available = available_fake1(PluginStatus::NotInstalled);
        let installed = [record("fake2", "v2.0.0"), record("fake1", "v1.0.0")];
        let phantoms = installed_but_not_discovered(&mut available, &installed);

        assert_eq!(phantoms.len(), 1);
        assert_eq!(available[0].status, PluginStatus::Installed);
        assert_eq!(available[0].installed_version.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn name_match_ignores_version_difference() {
        let mut available = available_fake1(PluginStatus::NotInstalled);
        available[0].recommended_version = "v4.0.0".into();
        let installed = [record("fake2", "v2.0.0"), record("fake1", "v1.0.0")];
        let phantoms = installed_but_not_discovered(&mut available, &installed);

        assert_eq!(phantoms.len(), 1);
        assert_eq!(phantoms[0].recommended_version, "v2.0.0");
        assert_eq!(available[0].status, PluginStatus::Installed);
    }

    #[test]
    fn name_match_ignores_target() {
        let mut available = vec![
            DiscoveredPlugin::new("login", Target::Kubernetes).with_recommended_version("v0.3.0"),
        ];
        let phantoms = installed_but_not_discovered(&mut available, &[record("login", "v0.2.0")]);

        assert_eq!(phantoms.len(), 1, "unknown-target record is still a phantom");
        assert_eq!(phantoms[0].target, Target::Unknown);
        assert_eq!(available[0].status, PluginStatus::Installed);
        assert_eq!(available[0].installed_version.as_deref(), Some("v0.2.0"));
    }

    #[test]
    fn update_available_is_left_alone() {
        let mut available = available_fake1(PluginStatus::UpdateAvailable);
        available[0].installed_version = Some("v0.9.0".into());
        installed_but_not_discovered(&mut available, &[record("fake1", "v1.0.0")]);

        assert_eq!(available[0].status, PluginStatus::UpdateAvailable);
        assert_eq!(available[0].installed_version.as_deref(), Some("v0.9.0"));
    }

    #[test]
    fn context_records_are_ignored() {
        let mut available = available_fake1(PluginStatus::NotInstalled);
        let ctx = record("fake1", "v1.0.0").with_scope(Scope::Context);
        let other = record("cluster", "v1.0.0").with_scope(Scope::Context);
        let phantoms = installed_but_not_discovered(&mut available, &[ctx, other]);

        assert!(phantoms.is_empty());
        assert_eq!(available[0].status, PluginStatus::NotInstalled);
    }
}
