//! Instantiation engine.
//!
//! `Container` turns a service name into a live instance, resolving the
//! transitive dependency set first. Each name has at most one construction
//! in flight; concurrent callers await the same shared future.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};

use crate::contracts::{Dependencies, Instance, ServiceInstance};
use crate::descriptor::ServiceDescriptor;
use crate::error::{shared, ContainerError};
use crate::graph;
use crate::store::DescriptorStore;

type Resolution = Shared<BoxFuture<'static, Result<Instance, ContainerError>>>;

/// Cheap, cloneable handle to the service container.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    store: DescriptorStore,
    in_flight: DashMap<String, Resolution>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("store", &self.inner.store)
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

/// Point-in-time view of one service.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub name: String,
    pub dependencies: Vec<String>,
    pub live: bool,
    pub generation: u64,
    pub since_reload: Option<Duration>,
}

impl Container {
    pub fn new(store: DescriptorStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                in_flight: DashMap::new(),
            }),
        }
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.inner.store
    }

    /// Resolve `name` to its live instance, constructing it (and whatever it
    /// depends on) if needed.
    pub fn resolve(&self, name: &str) -> BoxFuture<'static, Result<Instance, ContainerError>> {
        let this = self.clone();
        let name = name.to_owned();
        async move { this.resolve_inner(&name).await }.boxed()
    }

    /// Resolve and downcast to the concrete service type.
    pub async fn get<T: ServiceInstance>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let instance = self.resolve(name).await?;
        instance
            .into_any()
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                service: name.to_owned(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Live instance of `name` without triggering construction.
    pub fn instance(&self, name: &str) -> Option<Instance> {
        self.inner.store.find(name).and_then(|d| d.instance())
    }

    pub fn statuses(&self) -> Vec<ServiceStatus> {
        let now = tokio::time::Instant::now();
        self.inner
            .store
            .all()
            .iter()
            .map(|d| ServiceStatus {
                name: d.name().to_owned(),
                dependencies: d.dependencies().to_vec(),
                live: d.instance().is_some(),
                generation: d.generation(),
                since_reload: d
                    .last_reloaded_at()
                    .map(|at| now.saturating_duration_since(at)),
            })
            .collect()
    }

    async fn resolve_inner(&self, name: &str) -> Result<Instance, ContainerError> {
        let descriptor = self
            .inner
            .store
            .find(name)
            .cloned()
            .ok_or_else(|| ContainerError::UnknownService(name.to_owned()))?;

        if let Some(instance) = descriptor.instance() {
            return Ok(instance);
        }

        let pending = self.join_or_start(descriptor);
        let result = pending.clone().await;

        // Whoever gets here first retires the entry; the instance (if any)
        // already sits on the descriptor, and a failure must not stick.
        self.inner
            .in_flight
            .remove_if(name, |_, current| Shared::ptr_eq(current, &pending));

        result
    }

    /// Join the construction in flight for `descriptor`, or start one.
    ///
    /// A construction that finished between the caller's instance check and
    /// this call has already retired its entry, so a fresh entry re-checks
    /// the descriptor before running the factory.
    fn join_or_start(&self, descriptor: Arc<ServiceDescriptor>) -> Resolution {
        self.inner
            .in_flight
            .entry(descriptor.name().to_owned())
            .or_insert_with(|| {
                let this = self.clone();
                async move {
                    match descriptor.instance() {
                        Some(instance) => Ok(instance),
                        None => this.construct(descriptor).await,
                    }
                }
                .boxed()
                .shared()
            })
            .clone()
    }

    async fn construct(
        self,
        descriptor: Arc<ServiceDescriptor>,
    ) -> Result<Instance, ContainerError> {
        let name = descriptor.name();
        let closure = graph::transitive_dependencies(&self.inner.store, name)?;

        let resolved = try_join_all(closure.iter().map(|dep| self.resolve(dep))).await?;
        let arena: HashMap<&str, Instance> =
            closure.iter().map(String::as_str).zip(resolved).collect();

        let deps = Dependencies::new(
            descriptor
                .dependencies()
                .iter()
                .map(|dep| (dep.clone(), Arc::clone(&arena[dep.as_str()])))
                .collect(),
        );

        let definition = descriptor.definition();
        let instance = definition
            .factory
            .construct(deps, &definition.config)
            .await
            .map_err(|e| ContainerError::ConstructionFailure {
                service: name.to_owned(),
                source: shared(e),
            })?;

        let generation = descriptor.install(Arc::clone(&instance));
        if generation == 1 {
            tracing::info!(service = name, "Created");
        } else {
            tracing::info!(service = name, generation, "Reloaded");
        }
        Ok(instance)
    }

    /// Release every live instance, dependents before their dependencies
    /// (reverse registration order). Best effort.
    pub async fn shutdown(&self) {
        for descriptor in self.inner.store.all().iter().rev() {
            let Some(instance) = descriptor.take_instance() else {
                continue;
            };
            if let Err(e) = instance.release().await {
                tracing::warn!(service = descriptor.name(), error = %e, "Release hook failed");
            } else {
                tracing::debug!(service = descriptor.name(), "Released");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::FnFactory;
    use crate::definition::ServiceDefinition;
    use crate::testing::{store_of, Probe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn counting(
        name: &'static str,
        deps: &[&'static str],
        calls: Arc<AtomicUsize>,
    ) -> ServiceDescriptor {
        ServiceDescriptor::new(
            format!("{name}.yaml"),
            ServiceDefinition::new(Arc::new(FnFactory::new(name, deps, move |_, _| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Probe::instance(name))
                }
            }))),
        )
    }

    #[tokio::test]
    async fn unknown_service_is_rejected() {
        let container = Container::new(DescriptorStore::new());
        assert!(matches!(
            container.resolve("ghost").await,
            Err(ContainerError::UnknownService(n)) if n == "ghost"
        ));
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = DescriptorStore::new();
        store.register(counting("A", &[], calls.clone())).unwrap();
        let container = Container::new(store);

        let first = container.resolve("a").await.unwrap();
        let second = container.resolve("a").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(container.store().find("a").unwrap().generation(), 1);
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_construction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let factory = {
            let calls = calls.clone();
            let gate = gate.clone();
            FnFactory::new("Slow", &[], move |_, _| {
                let calls = calls.clone();
                let gate = gate.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Ok(Probe::instance("slow"))
                }
            })
        };
        let mut store = DescriptorStore::new();
        store
            .register(ServiceDescriptor::new(
                "slow.yaml",
                ServiceDefinition::new(Arc::new(factory)),
            ))
            .unwrap();
        let container = Container::new(store);

        let a = tokio::spawn(container.resolve("slow"));
        let b = tokio::spawn(container.resolve("slow"));

        // Let both callers reach the pending construction.
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn late_joiner_reuses_instance_installed_meanwhile() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = DescriptorStore::new();
        store.register(counting("S", &[], calls.clone())).unwrap();
        let container = Container::new(store);
        let descriptor = container.store().find("s").cloned().unwrap();

        // Another caller's construction completes and retires its entry
        // after this caller saw no instance.
        assert!(descriptor.instance().is_none());
        let installed = Probe::instance("installed");
        descriptor.install(Arc::clone(&installed));
        assert!(container.inner.in_flight.is_empty());

        let joined = container.join_or_start(Arc::clone(&descriptor)).await.unwrap();

        assert!(Arc::ptr_eq(&joined, &installed));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(descriptor.generation(), 1);
    }

    #[tokio::test]
    async fn diamond_dependency_is_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = DescriptorStore::new();
        store.register(counting("Base", &[], calls.clone())).unwrap();
        store
            .register(counting("Left", &["Base"], Arc::new(AtomicUsize::new(0))))
            .unwrap();
        store
            .register(counting("Right", &["Base"], Arc::new(AtomicUsize::new(0))))
            .unwrap();
        store
            .register(counting("Top", &["Left", "Right"], Arc::new(AtomicUsize::new(0))))
            .unwrap();
        let container = Container::new(store);

        container.resolve("top").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for name in ["base", "left", "right", "top"] {
            assert!(container.instance(name).is_some(), "{name} should be live");
        }
    }

    #[tokio::test]
    async fn dependencies_are_passed_in_declared_order() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let recorder = {
            let seen = seen.clone();
            FnFactory::new("UserService", &["MailService", "HttpService"], move |deps, _| {
                let seen = seen.clone();
                async move {
                    *seen.lock() = deps
                        .iter()
                        .map(|(n, i)| format!("{n}={}", Probe::label(i)))
                        .collect();
                    Ok(Probe::instance("user"))
                }
            })
        };

        let mut store = store_of(&[("HttpService", &[]), ("MailService", &[])]);
        store
            .register(ServiceDescriptor::new(
                "users.yaml",
                ServiceDefinition::new(Arc::new(recorder)),
            ))
            .unwrap();
        let container = Container::new(store);

        container.resolve("userService").await.unwrap();
        assert_eq!(
            *seen.lock(),
            ["mailService=MailService", "httpService=HttpService"]
        );
    }

    #[tokio::test]
    async fn construction_failure_propagates_and_can_be_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let flaky = {
            let attempts = attempts.clone();
            FnFactory::new("Flaky", &[], move |_, _| {
                let attempts = attempts.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("first boot fails");
                    }
                    Ok(Probe::instance("flaky"))
                }
            })
        };
        let mut store = store_of(&[]);
        store
            .register(ServiceDescriptor::new(
                "flaky.yaml",
                ServiceDefinition::new(Arc::new(flaky)),
            ))
            .unwrap();
        let container = Container::new(store);

        match container.resolve("flaky").await {
            Err(ContainerError::ConstructionFailure { service, .. }) => {
                assert_eq!(service, "flaky")
            }
            other => panic!("expected ConstructionFailure, got {:?}", other.map(|_| ())),
        }
        assert!(container.instance("flaky").is_none());

        container.resolve("flaky").await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dependency_failure_fails_dependent() {
        let failing = FnFactory::new("Broken", &[], |_, _| async {
            Err::<Instance, _>(anyhow::anyhow!("boom"))
        });
        let mut store = DescriptorStore::new();
        store
            .register(ServiceDescriptor::new(
                "broken.yaml",
                ServiceDefinition::new(Arc::new(failing)),
            ))
            .unwrap();
        store
            .register(ServiceDescriptor::new(
                "top.yaml",
                crate::testing::probe_definition("Top", &["Broken"]),
            ))
            .unwrap();
        let container = Container::new(store);

        let err = container.resolve("top").await.map(|_| ()).unwrap_err();
        assert!(matches!(err, ContainerError::ConstructionFailure { ref service, .. } if service == "broken"));
        assert!(container.instance("top").is_none());
    }

    #[tokio::test]
    async fn cycle_through_root_fails_resolution() {
        let container = Container::new(store_of(&[("A", &["B"]), ("B", &["A"])]));
        assert!(matches!(
            container.resolve("a").await.map(|_| ()),
            Err(ContainerError::CyclicDependency { .. })
        ));
    }

    #[tokio::test]
    async fn intermediate_cycle_fails_via_nested_resolution() {
        let container = Container::new(store_of(&[("A", &["B"]), ("B", &["C"]), ("C", &["B"])]));
        match container.resolve("a").await.map(|_| ()) {
            Err(ContainerError::CyclicDependency { root, .. }) => {
                assert!(root == "b" || root == "c", "unexpected root {root}")
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_downcasts_or_reports_mismatch() {
        let container = Container::new(store_of(&[("A", &[])]));
        let probe = container.get::<Probe>("a").await.unwrap();
        assert_eq!(probe.label, "A");

        struct NotAProbe;
        impl ServiceInstance for NotAProbe {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
                self
            }
        }
        assert!(matches!(
            container.get::<NotAProbe>("a").await.map(|_| ()),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn shutdown_releases_everything() {
        let container = Container::new(store_of(&[("A", &[]), ("B", &["A"])]));
        container.resolve("b").await.unwrap();
        assert!(container.statuses().iter().all(|s| s.live));

        container.shutdown().await;
        assert!(container.statuses().iter().all(|s| !s.live));
    }
}
