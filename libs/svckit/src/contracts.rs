use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::service_name;

/// A live, container-owned service instance.
pub type Instance = Arc<dyn ServiceInstance>;

/// Anything the container can hand out to dependents.
#[async_trait]
pub trait ServiceInstance: Any + Send + Sync {
    /// Release hook invoked before the instance is discarded by a reload
    /// or at shutdown. Failures are logged, never propagated.
    async fn release(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Constructor side of a service: what it is called, what it needs, and how
/// to build it once its dependencies are live.
#[async_trait]
pub trait ServiceFactory: Send + Sync + 'static {
    /// Exported name, e.g. `UserService`. The descriptor name is derived
    /// from it by lower-casing the first character.
    fn name(&self) -> &str;

    /// Declared dependency names, in constructor argument order.
    fn dependencies(&self) -> &[&str];

    async fn construct(
        &self,
        deps: Dependencies,
        config: &serde_json::Value,
    ) -> anyhow::Result<Instance>;
}

/// Resolved dependency instances for one construction, in declaration order.
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: Vec<(String, Instance)>,
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

impl Dependencies {
    pub fn new(entries: Vec<(String, Instance)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Positional access, matching the declared order.
    pub fn at(&self, index: usize) -> Option<&Instance> {
        self.entries.get(index).map(|(_, inst)| inst)
    }

    /// Lookup by name; accepts both `HttpService` and `httpService`.
    pub fn get(&self, name: &str) -> Option<&Instance> {
        let name = service_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, inst)| inst)
    }

    /// Typed lookup for constructors that know the concrete dependency type.
    pub fn require<T: ServiceInstance>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        let inst = self
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("dependency '{name}' was not resolved"))?;
        Arc::clone(inst).into_any().downcast::<T>().map_err(|_| {
            anyhow::anyhow!(
                "dependency '{name}' is not a {}",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.entries.iter().map(|(n, i)| (n.as_str(), i))
    }
}

/// Closure-backed factory. Handy for embedding and for tests; link-time
/// services usually implement [`ServiceFactory`] on a unit struct instead.
pub struct FnFactory<F> {
    name: &'static str,
    deps: Vec<&'static str>,
    ctor: F,
}

impl<F, Fut> FnFactory<F>
where
    F: Fn(Dependencies, serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Instance>> + Send + 'static,
{
    pub fn new(name: &'static str, deps: &[&'static str], ctor: F) -> Self {
        Self {
            name,
            deps: deps.to_vec(),
            ctor,
        }
    }
}

#[async_trait]
impl<F, Fut> ServiceFactory for FnFactory<F>
where
    F: Fn(Dependencies, serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Instance>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> &[&str] {
        &self.deps
    }

    async fn construct(
        &self,
        deps: Dependencies,
        config: &serde_json::Value,
    ) -> anyhow::Result<Instance> {
        (self.ctor)(deps, config.clone()).await
    }
}
