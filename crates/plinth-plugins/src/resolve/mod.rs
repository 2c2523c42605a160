//! Turning raw discovery output into the available-plugins view.
//!
//! The passes run single-threaded over a complete snapshot, because every
//! rule depends on the other entries with the same name:
//!
//! 1. [`dedup`] collapses conflicting entries.
//! 2. [`resolve_status`] matches installed records on `(name, target)`.
//! 3. [`installed_but_not_discovered`] applies the name-only legacy rules and
//!    yields phantom entries, which are appended and deduplicated again.

mod dedup;
mod legacy;
mod status;

pub use dedup::dedup;
pub use legacy::installed_but_not_discovered;
pub use status::resolve_status;

use crate::plugin::{DiscoveredPlugin, InstalledPlugin, Scope};

/// Run the full resolution pipeline.
#[must_use]
pub fn available_view(
    discovered: Vec<DiscoveredPlugin>,
    installed: &[InstalledPlugin],
) -> Vec<DiscoveredPlugin> {
    let mut available = dedup(discovered);
    resolve_status(&mut available, installed);

    let standalone: Vec<InstalledPlugin> = installed
        .iter()
        .filter(|r| r.scope == Scope::Standalone)
        .cloned()
        .collect();
    let phantoms = installed_but_not_discovered(&mut available, &standalone);
    available.extend(phantoms);

    dedup(available)
}
