//! Dependency graph over descriptor names.
//!
//! Cycle detection is root-relative: while expanding the closure of `root`,
//! reaching `root` again is an error. A loop that closes on an intermediate
//! service (`a -> b -> c -> b`) is not reported for `a`; it is reported as
//! soon as one of its members is itself expanded as a root, which every
//! resolution of `a` does for `b` and `c`.

use crate::error::ContainerError;
use crate::store::DescriptorStore;

/// Full transitive dependency set of `name`, de-duplicated, in discovery
/// order (direct dependencies first, then what each of them pulls in).
pub fn transitive_dependencies(
    store: &DescriptorStore,
    name: &str,
) -> Result<Vec<String>, ContainerError> {
    let mut closure = Vec::new();
    expand(store, name, name, &mut closure)
}

/// `closure` is shared by the whole walk: every name pushed so far. A name is
/// expanded at most once, which keeps non-root loops from recursing forever.
fn expand(
    store: &DescriptorStore,
    service: &str,
    root: &str,
    closure: &mut Vec<String>,
) -> Result<Vec<String>, ContainerError> {
    let descriptor = store
        .find(service)
        .ok_or_else(|| ContainerError::UnknownService(service.to_owned()))?;

    let mut deps: Vec<String> = descriptor.dependencies().to_vec();

    for dep in descriptor.dependencies() {
        if dep == root {
            return Err(ContainerError::CyclicDependency {
                root: root.to_owned(),
                service: service.to_owned(),
            });
        }
        if closure.contains(dep) {
            continue;
        }
        closure.push(dep.clone());

        for nested in expand(store, dep, root, closure)? {
            if !deps.contains(&nested) {
                deps.push(nested);
            }
        }
    }

    Ok(deps)
}

/// Expand every service as a root without constructing anything. Catches
/// every cycle (each member is a root once) and every unknown dependency.
pub fn validate(store: &DescriptorStore) -> Result<(), ContainerError> {
    for descriptor in store.all() {
        transitive_dependencies(store, descriptor.name())?;
    }
    Ok(())
}
