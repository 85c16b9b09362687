//! Service definitions and the loaders that (re)produce them from a source
//! location.
//!
//! A definition on disk is a small YAML manifest naming a catalog factory:
//!
//! ```yaml
//! service: UserService
//! config:
//!   sender: noreply@example.com
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::catalog::FactoryCatalog;
use crate::contracts::ServiceFactory;

/// The currently loaded constructor of a service plus its configuration.
#[derive(Clone)]
pub struct ServiceDefinition {
    pub factory: Arc<dyn ServiceFactory>,
    pub config: serde_json::Value,
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("factory", &self.factory.name())
            .field("config", &self.config)
            .finish()
    }
}

impl ServiceDefinition {
    pub fn new(factory: Arc<dyn ServiceFactory>) -> Self {
        Self {
            factory,
            config: serde_json::Value::Null,
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

/// Produces a definition for a source location. Called once per file at
/// discovery and again for every reload of that file.
#[async_trait]
pub trait DefinitionLoader: Send + Sync {
    async fn load(&self, source: &Path) -> anyhow::Result<ServiceDefinition>;
}

/// On-disk manifest shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Exported name of the factory implementing this service.
    pub service: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Reads YAML manifests and binds them to factories from the catalog.
pub struct ManifestLoader {
    catalog: Arc<FactoryCatalog>,
}

impl ManifestLoader {
    pub fn new(catalog: Arc<FactoryCatalog>) -> Self {
        Self { catalog }
    }

    pub fn parse(&self, raw: &str) -> anyhow::Result<ServiceDefinition> {
        let manifest: Manifest =
            serde_yaml::from_str(raw).context("invalid service manifest")?;
        let factory = self.catalog.get(&manifest.service).ok_or_else(|| {
            anyhow::anyhow!(
                "no factory registered for '{}' (known: {})",
                manifest.service,
                self.catalog.names().join(", ")
            )
        })?;
        Ok(ServiceDefinition::new(factory).with_config(manifest.config))
    }
}

#[async_trait]
impl DefinitionLoader for ManifestLoader {
    async fn load(&self, source: &Path) -> anyhow::Result<ServiceDefinition> {
        let raw = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read {}", source.display()))?;
        self.parse(&raw)
    }
}

/// In-memory definitions keyed by path; [`set`](Self::set) stands in for
/// editing the file on disk.
#[derive(Default)]
pub struct MemoryLoader {
    definitions: DashMap<PathBuf, ServiceDefinition>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, source: impl Into<PathBuf>, definition: ServiceDefinition) {
        self.definitions.insert(source.into(), definition);
    }

    pub fn remove(&self, source: &Path) {
        self.definitions.remove(source);
    }

    /// Sources in path order, which is the order discovery would see them.
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.definitions.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl DefinitionLoader for MemoryLoader {
    async fn load(&self, source: &Path) -> anyhow::Result<ServiceDefinition> {
        self.definitions
            .get(source)
            .map(|d| d.value().clone())
            .ok_or_else(|| anyhow::anyhow!("no definition at {}", source.display()))
    }
}
