//! # SvcKit - Hot-Reloadable Service Container
//!
//! Services are declared by small YAML manifests in one directory. Each
//! manifest names a factory linked into the binary and carries its config:
//!
//! ```yaml
//! service: UserService
//! config:
//!   greeting: Welcome aboard
//! ```
//!
//! The factory declares which services it needs by name. The container
//! resolves those first, constructs each service at most once, and keeps the
//! instance until its manifest changes on disk. A change rebuilds the service
//! and its direct dependents; a failed rebuild keeps the previous instances.
//!
//! ## Declaring a service
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use svckit::{async_trait, Dependencies, Instance, ServiceFactory};
//!
//! pub struct UserServiceFactory;
//!
//! #[async_trait]
//! impl ServiceFactory for UserServiceFactory {
//!     fn name(&self) -> &str { "UserService" }
//!     fn dependencies(&self) -> &[&str] { &["HttpService", "MailService"] }
//!     async fn construct(&self, deps: Dependencies, config: &serde_json::Value)
//!         -> anyhow::Result<Instance> { /* ... */ }
//! }
//!
//! svckit::inventory::submit! {
//!     svckit::FactoryRegistrator(|| Arc::new(UserServiceFactory))
//! }
//! ```

pub use async_trait::async_trait;
pub use inventory;

pub mod catalog;
pub mod container;
pub mod contracts;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod reload;
pub mod runtime;
pub mod startup;
pub mod store;

#[cfg(test)]
mod testing;

pub use catalog::{FactoryCatalog, FactoryRegistrator};
pub use container::{Container, ServiceStatus};
pub use contracts::{Dependencies, FnFactory, Instance, ServiceFactory, ServiceInstance};
pub use definition::{DefinitionLoader, Manifest, ManifestLoader, MemoryLoader, ServiceDefinition};
pub use descriptor::{service_name, ServiceDescriptor};
pub use error::ContainerError;
pub use reload::{ReloadOptions, ReloadReport, ReloadSupervisor};
pub use runtime::{run, RunOptions, ShutdownOptions};
pub use startup::{resolution_order, resolve_all};
pub use store::DescriptorStore;
