//! Shared harness for plugin manager integration tests.
//!
//! Mirrors a typical installation: one standalone source and two active
//! contexts (a Kubernetes management cluster and a mission-control endpoint)
//! with overlapping plugin names.

use std::sync::Arc;

use plinth_plugins::{
    Catalog, ContextDiscovery, DiscoveryFailurePolicy, DiscoveryPlan, FileTransport,
    ManagerConfig, MemoryCatalog, Platform, PluginManager, Target, TrustPolicy,
};
use plinth_test::{JsonFileInspector, SourceDir};
use tempfile::TempDir;

/// Every discovered `(name, target, recommended_version)` of the default plan.
#[allow(dead_code)]
pub const DEFAULT_PLAN_PLUGINS: &[(&str, Target, &str)] = &[
    ("cluster", Target::Kubernetes, "v1.6.0"),
    ("cluster", Target::MissionControl, "v0.2.0"),
    ("management-cluster", Target::MissionControl, "v0.2.0"),
    ("login", Target::Unknown, "v0.2.0"),
    ("management-cluster", Target::Kubernetes, "v1.6.0"),
    ("myplugin", Target::Kubernetes, "v1.6.0"),
    ("myplugin", Target::MissionControl, "v0.2.0"),
];

/// Owns the fixture directories and the catalog shared by every manager it builds.
#[allow(dead_code)]
pub struct ManagerHarness {
    /// Catalog shared by all managers of this harness.
    pub catalog: Arc<dyn Catalog>,
    /// Platform the fixtures were built for.
    pub platform: Platform,
    /// Standalone source.
    pub standalone: SourceDir,
    /// Sources of the `mgmt` (Kubernetes) context.
    pub mgmt: SourceDir,
    /// Sources of the `tmc-fake` (mission-control) context.
    pub tmc: SourceDir,
    plugin_root: TempDir,
}

#[allow(dead_code)]
impl ManagerHarness {
    /// Harness backed by an in-memory catalog.
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(MemoryCatalog::new()))
    }

    /// Harness backed by the given catalog.
    pub fn with_catalog(catalog: Arc<dyn Catalog>) -> Self {
        plinth_test::init_test_logging();
        let platform = Platform::new("linux", "amd64");

        let standalone = SourceDir::new(&platform);
        standalone
            .add_plugin("login", Target::Unknown, "v0.2.0", &["v0.1.0", "v0.2.0"])
            .add_plugin("management-cluster", Target::Kubernetes, "v1.6.0", &["v1.6.0"])
            .add_plugin("myplugin", Target::Kubernetes, "v1.6.0", &["v1.6.0"])
            .add_plugin("myplugin", Target::MissionControl, "v0.2.0", &["v0.2.0"]);

        // Context entries without a target inherit the context's.
        let mgmt = SourceDir::new(&platform);
        mgmt.add_plugin("cluster", Target::Unknown, "v1.6.0", &["v1.6.0"]);

        let tmc = SourceDir::new(&platform);
        tmc.add_plugin("cluster", Target::MissionControl, "v0.2.0", &["v0.1.0", "v0.2.0"])
            .add_plugin("management-cluster", Target::MissionControl, "v0.2.0", &["v0.2.0"]);

        Self {
            catalog,
            platform,
            standalone,
            mgmt,
            tmc,
            plugin_root: TempDir::new().expect("failed to create plugin root"),
        }
    }

    /// The context part of the default plan.
    pub fn contexts(&self) -> Vec<ContextDiscovery> {
        vec![
            ContextDiscovery {
                name: "mgmt".into(),
                target: Target::Kubernetes,
                sources: vec![self.mgmt.source("mgmt-local")],
            },
            ContextDiscovery {
                name: "tmc-fake".into(),
                target: Target::MissionControl,
                sources: vec![self.tmc.source("tmc-local")],
            },
        ]
    }

    /// One standalone source plus both contexts.
    pub fn default_plan(&self) -> DiscoveryPlan {
        DiscoveryPlan {
            standalone: vec![self.standalone.source("default-local")],
            contexts: self.contexts(),
        }
    }

    /// Directory installed binaries are written to.
    pub fn plugin_root(&self) -> &std::path::Path {
        self.plugin_root.path()
    }

    /// Manager config for this harness.
    pub fn config(&self) -> ManagerConfig {
        ManagerConfig::new(self.plugin_root.path())
            .with_platform(self.platform.clone())
            .with_failure_policy(DiscoveryFailurePolicy::FailFast)
    }

    /// Manager over the default plan.
    pub fn manager(&self) -> PluginManager {
        self.manager_with_plan(self.default_plan())
    }

    /// Manager over an arbitrary plan, sharing this harness's catalog.
    pub fn manager_with_plan(&self, plan: DiscoveryPlan) -> PluginManager {
        PluginManager::new(
            self.config(),
            Arc::clone(&self.catalog),
            Arc::new(FileTransport),
            Arc::new(JsonFileInspector),
        )
        .with_trust_policy(TrustPolicy::default())
        .with_discovery_plan(plan)
    }
}
