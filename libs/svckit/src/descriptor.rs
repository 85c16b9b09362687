use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use crate::contracts::Instance;
use crate::definition::ServiceDefinition;

/// Descriptor name for an exported service name: first character lower-cased.
///
/// `UserService` → `userService`; already-normalised names pass through.
pub fn service_name(exported: &str) -> String {
    let mut chars = exported.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Mutable half of a descriptor. Swapped as a unit so readers never see a
/// new definition next to an old instance.
#[derive(Clone)]
pub(crate) struct DescriptorState {
    pub(crate) definition: Arc<ServiceDefinition>,
    pub(crate) instance: Option<Instance>,
    pub(crate) generation: u64,
    pub(crate) last_reloaded_at: Option<Instant>,
}

/// Snapshot taken by the reload transaction so that a failed attempt can be
/// undone exactly.
pub(crate) struct Snapshot(DescriptorState);

/// One discoverable service: immutable identity plus versioned state.
pub struct ServiceDescriptor {
    name: String,
    source: PathBuf,
    dependencies: Vec<String>,
    state: RwLock<DescriptorState>,
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("dependencies", &self.dependencies)
            .field("has_instance", &state.instance.is_some())
            .field("generation", &state.generation)
            .finish()
    }
}

impl ServiceDescriptor {
    /// Build a descriptor from a freshly loaded definition. Name and
    /// dependency list are taken from the factory once and never change.
    pub fn new(source: impl Into<PathBuf>, definition: ServiceDefinition) -> Self {
        let name = service_name(definition.factory.name());
        let dependencies = definition
            .factory
            .dependencies()
            .iter()
            .map(|d| service_name(d))
            .collect();
        Self {
            name,
            source: source.into(),
            dependencies,
            state: RwLock::new(DescriptorState {
                definition: Arc::new(definition),
                instance: None,
                generation: 0,
                last_reloaded_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Declared dependency names, in constructor order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }

    pub fn definition(&self) -> Arc<ServiceDefinition> {
        Arc::clone(&self.state.read().definition)
    }

    pub fn instance(&self) -> Option<Instance> {
        self.state.read().instance.clone()
    }

    /// Number of successful (re)instantiations so far.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn last_reloaded_at(&self) -> Option<Instant> {
        self.state.read().last_reloaded_at
    }

    /// True when the last successful (re)instantiation is younger than `window`.
    pub fn reloaded_within(&self, window: Duration, now: Instant) -> bool {
        self.last_reloaded_at()
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    pub(crate) fn install(&self, instance: Instance) -> u64 {
        let mut state = self.state.write();
        state.instance = Some(instance);
        state.generation += 1;
        state.last_reloaded_at = Some(Instant::now());
        state.generation
    }

    pub(crate) fn replace_definition(&self, definition: ServiceDefinition) {
        self.state.write().definition = Arc::new(definition);
    }

    pub(crate) fn take_instance(&self) -> Option<Instance> {
        self.state.write().instance.take()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot(self.state.read().clone())
    }

    pub(crate) fn restore(&self, snapshot: Snapshot) {
        *self.state.write() = snapshot.0;
    }
}
