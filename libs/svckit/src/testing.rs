//! Shared fixtures for unit tests.

use std::any::Any;
use std::sync::Arc;

use crate::contracts::{FnFactory, Instance, ServiceInstance};
use crate::definition::ServiceDefinition;
use crate::descriptor::ServiceDescriptor;
use crate::store::DescriptorStore;

/// Labelled instance with no behaviour.
pub struct Probe {
    pub label: String,
}

impl ServiceInstance for Probe {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl Probe {
    pub fn instance(label: &str) -> Instance {
        Arc::new(Probe {
            label: label.to_owned(),
        })
    }

    pub fn label(instance: &Instance) -> String {
        instance
            .as_any()
            .downcast_ref::<Probe>()
            .map(|p| p.label.clone())
            .unwrap_or_default()
    }
}

pub fn probe_definition(name: &'static str, deps: &[&'static str]) -> ServiceDefinition {
    ServiceDefinition::new(Arc::new(FnFactory::new(
        name,
        deps,
        move |_, _| async move { Ok(Probe::instance(name)) },
    )))
}

/// Store with one descriptor per `(exported name, deps)`, in order.
pub fn store_of(services: &[(&'static str, &[&'static str])]) -> DescriptorStore {
    let mut store = DescriptorStore::new();
    for (name, deps) in services {
        store
            .register(ServiceDescriptor::new(
                format!("{name}.yaml"),
                probe_definition(name, deps),
            ))
            .unwrap();
    }
    store
}
