use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contracts::ServiceFactory;
use crate::error::ContainerError;

/// Submitted by service crates via `inventory::submit!`:
///
/// ```rust,ignore
/// svckit::inventory::submit! {
///     svckit::FactoryRegistrator(|| std::sync::Arc::new(MailServiceFactory))
/// }
/// ```
pub struct FactoryRegistrator(pub fn() -> Arc<dyn ServiceFactory>);

inventory::collect!(FactoryRegistrator);

/// Factories available to service manifests, keyed by exported name.
#[derive(Default)]
pub struct FactoryCatalog {
    factories: BTreeMap<String, Arc<dyn ServiceFactory>>,
}

impl std::fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryCatalog")
            .field("factories", &self.names())
            .finish()
    }
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every factory linked into the binary.
    pub fn discover() -> Result<Self, ContainerError> {
        let mut catalog = Self::new();
        for r in ::inventory::iter::<FactoryRegistrator> {
            catalog.register(r.0())?;
        }
        tracing::debug!(factories = ?catalog.names(), "Service factory catalog built");
        Ok(catalog)
    }

    pub fn register(&mut self, factory: Arc<dyn ServiceFactory>) -> Result<(), ContainerError> {
        let name = factory.name().to_owned();
        if self.factories.contains_key(&name) {
            return Err(ContainerError::DuplicateFactory(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServiceFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
