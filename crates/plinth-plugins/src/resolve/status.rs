//! Installation status of discovered plugins.

use crate::plugin::{DiscoveredPlugin, InstalledPlugin, PluginStatus};

/// Annotate each discovered entry with the installed record of the same
/// `(name, target)`.
///
/// Update detection compares the recommendation recorded at install time
/// with the source's current recommendation. The installed version itself is
/// not compared: a plugin stays [`PluginStatus::Installed`] while upstream is
/// unchanged, and becomes [`PluginStatus::UpdateAvailable`] as soon as the
/// recommendation moves.
pub fn resolve_status(available: &mut [DiscoveredPlugin], installed: &[InstalledPlugin]) {
    for plugin in available.iter_mut() {
        match installed.iter().find(|r| r.is(&plugin.name, plugin.target)) {
            None => {
                plugin.installed_version = None;
                plugin.status = PluginStatus::NotInstalled;
            },
            Some(record) => {
                plugin.installed_version = Some(record.version.clone());
                plugin.status =
                    if record.discovered_recommended_version == plugin.recommended_version {
                        PluginStatus::Installed
                    } else {
                        PluginStatus::UpdateAvailable
                    };
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Target;

    fn fake1(target: Target, recommended: &str) -> DiscoveredPlugin {
        DiscoveredPlugin::new("fake1", target).with_recommended_version(recommended)
    }

    #[test]
    fn unrelated_record_leaves_not_installed() {
        let mut available = vec![fake1(Target::Kubernetes, "v1.0.0")];
        let installed = vec![InstalledPlugin::new("fake2", Target::Unknown, "v2.0.0")];

        resolve_status(&mut available, &installed);
        assert_eq!(available[0].installed_version, None);
        assert_eq!(available[0].status, PluginStatus::NotInstalled);
    }

    #[test]
    fn target_mismatch_is_not_a_match() {
        let mut available = vec![fake1(Target::Kubernetes, "v1.0.0")];
        let installed = vec![InstalledPlugin::new("fake1", Target::Unknown, "v1.0.0")];

        resolve_status(&mut available, &installed);
        assert_eq!(available[0].installed_version, None);
        assert_eq!(available[0].status, PluginStatus::NotInstalled);
    }

    #[test]
    fn exact_match_is_installed() {
        let mut available = vec![fake1(Target::Kubernetes, "v1.0.0")];
        let installed = vec![InstalledPlugin::new("fake1", Target::Kubernetes, "v1.0.0")];

        resolve_status(&mut available, &installed);
        assert_eq!(available[0].installed_version.as_deref(), Some("v1.0.0"));
        assert_eq!(available[0].status, PluginStatus::Installed);
    }

    #[test]
    fn changed_recommendation_is_update_available() {
        let mut available = vec![fake1(Target::Unknown, "v8.0.0-latest")];
        let installed = vec![InstalledPlugin::new("fake1", Target::Unknown, "v1.0.0")];

        resolve_status(&mut available, &installed);
        assert_eq!(available[0].installed_version.as_deref(), Some("v1.0.0"));
        assert_eq!(available[0].status, PluginStatus::UpdateAvailable);
    }

    #[test]
    fn unchanged_recommendation_is_installed_despite_version_difference() {
        let mut available = vec![fake1(Target::Kubernetes, "v8")];
        let installed = vec![
            InstalledPlugin::new("fake1", Target::Kubernetes, "v1")
                .with_discovered_recommended_version("v8"),
        ];

        resolve_status(&mut available, &installed);
        assert_eq!(available[0].installed_version.as_deref(), Some("v1"));
        assert_eq!(available[0].status, PluginStatus::Installed);

        available[0].recommended_version = "v3".into();
        available[0].status = PluginStatus::NotInstalled;
        resolve_status(&mut available, &installed);
        assert_eq!(available[0].recommended_version, "v3");
        assert_eq!(available[0].installed_version.as_deref(), Some("v1"));
        assert_eq!(available[0].status, PluginStatus::UpdateAvailable);
    }

    #[test]
    fn stale_annotation_is_cleared() {
        let mut available = vec![fake1(Target::Global, "v1")];
        available[0].status = PluginStatus::Installed;
        available[0].installed_version = Some("v1".into());

        resolve_status(&mut available, &[]);
        assert_eq!(available[0].installed_version, None);
        assert_eq!(available[0].status, PluginStatus::NotInstalled);
    }
}
