//! Startup scheduling: resolve every known service once, most depended-upon
//! first, one at a time.

use std::collections::HashMap;

use crate::container::Container;
use crate::error::ContainerError;
use crate::store::DescriptorStore;

/// Reference-count order over every name seen in the store.
///
/// A name scores one for being a service and one more per appearance in
/// someone's dependency list. Higher counts come first; ties keep first-seen
/// order. Dependency names without a descriptor are included, so a dangling
/// reference surfaces as `UnknownService` during [`resolve_all`].
pub fn resolution_order(store: &DescriptorStore) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut bump = |name: &str| match index.get(name) {
        Some(&i) => counts[i].1 += 1,
        None => {
            index.insert(name.to_owned(), counts.len());
            counts.push((name.to_owned(), 1));
        }
    };

    for descriptor in store.all() {
        bump(descriptor.name());
        for dep in descriptor.dependencies() {
            bump(dep);
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Resolve every service serially in [`resolution_order`]. The first error
/// aborts the pass; callers at process start treat it as fatal.
pub async fn resolve_all(container: &Container) -> Result<(), ContainerError> {
    let order = resolution_order(container.store());
    tracing::debug!(order = ?order, "Startup resolution order");

    for (name, refs) in &order {
        tracing::trace!(service = %name, refs, "Resolving");
        container.resolve(name).await?;
    }

    tracing::info!(services = order.len(), "All services resolved");
    Ok(())
}
