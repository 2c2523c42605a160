//! Conflict resolution between entries that share a plugin name.
//!
//! Precedence, applied per name:
//!
//! 1. A context-scoped entry replaces the standalone entry for the same target.
//! 2. An [`Target::Unknown`] entry is dropped when the name is also available
//!    for a concrete target, whatever its scope.
//! 3. Only the first entry of each surviving `(target, scope)` pair is kept.
//!
//! Scope precedence runs first so that rule 2 sees the scope-resolved set.

use std::collections::{HashMap, HashSet};

use crate::plugin::{DiscoveredPlugin, Scope, Target};

/// Collapse duplicates so that `(name, target)` is unique in the output.
///
/// Surviving entries keep their relative order. Idempotent.
#[must_use]
pub fn dedup(plugins: Vec<DiscoveredPlugin>) -> Vec<DiscoveredPlugin> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, plugin) in plugins.iter().enumerate() {
        groups.entry(plugin.name.as_str()).or_default().push(idx);
    }

    let mut keep = vec![true; plugins.len()];
    for indices in groups.values() {
        resolve_group(&plugins, indices, &mut keep);
    }

    plugins
        .into_iter()
        .zip(keep)
        .filter_map(|(plugin, kept)| kept.then_some(plugin))
        .collect()
}

fn resolve_group(plugins: &[DiscoveredPlugin], indices: &[usize], keep: &mut [bool]) {
    let context_targets: HashSet<Target> = indices
        .iter()
        .map(|&i| &plugins[i])
        .filter(|p| p.scope == Scope::Context)
        .map(|p| p.target)
        .collect();

    for &i in indices {
        let p = &plugins[i];
        if p.scope == Scope::Standalone && context_targets.contains(&p.target) {
            keep[i] = false;
        }
    }

    let has_concrete = indices
        .iter()
        .any(|&i| keep[i] && plugins[i].target.is_concrete());
    if has_concrete {
        for &i in indices {
            if !plugins[i].target.is_concrete() {
                keep[i] = false;
            }
        }
    }

    let mut seen: HashSet<(Target, Scope)> = HashSet::new();
    for &i in indices {
        if keep[i] && !seen.insert((plugins[i].target, plugins[i].scope)) {
            keep[i] = false;
        }
    }
}
