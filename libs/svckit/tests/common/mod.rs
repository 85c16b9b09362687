#![allow(dead_code)]

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use svckit::{
    Container, DescriptorStore, FactoryCatalog, FnFactory, Instance, ManifestLoader,
    ReloadOptions, ReloadSupervisor, ServiceInstance,
};
use tempfile::TempDir;

/// Service instance recording its config tag and the instances it was built with.
pub struct Node {
    pub name: String,
    pub tag: String,
    pub deps: Vec<Instance>,
}

impl ServiceInstance for Node {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub fn node(instance: &Instance) -> &Node {
    instance
        .as_any()
        .downcast_ref::<Node>()
        .expect("instance is a Node")
}

/// Services in a temp directory, backed by `Node` factories.
///
/// Manifest config: `tag` (string, default "v1") is recorded on the node;
/// `fail: true` makes construction fail.
pub struct Fixture {
    pub dir: TempDir,
    pub builds: Arc<DashMap<String, usize>>,
    pub loader: Arc<ManifestLoader>,
}

impl Fixture {
    pub fn new(services: &[(&'static str, &'static [&'static str])]) -> Self {
        let builds = Arc::new(DashMap::new());
        let mut catalog = FactoryCatalog::new();
        for &(name, deps) in services {
            let builds = builds.clone();
            catalog
                .register(Arc::new(FnFactory::new(name, deps, move |d, cfg| {
                    let builds = builds.clone();
                    async move {
                        if cfg["fail"].as_bool() == Some(true) {
                            anyhow::bail!("{name} refused to start");
                        }
                        *builds.entry(name.to_owned()).or_insert(0) += 1;
                        Ok(Arc::new(Node {
                            name: name.to_owned(),
                            tag: cfg["tag"].as_str().unwrap_or("v1").to_owned(),
                            deps: d.iter().map(|(_, i)| Arc::clone(i)).collect(),
                        }) as Instance)
                    }
                })))
                .unwrap();
        }

        Self {
            dir: tempfile::tempdir().unwrap(),
            builds,
            loader: Arc::new(ManifestLoader::new(Arc::new(catalog))),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    /// Write (or overwrite) `file` declaring `service` with `tag`.
    pub fn write(&self, file: &str, service: &str, tag: &str) -> PathBuf {
        self.write_raw(
            file,
            &format!("service: {service}\nconfig:\n  tag: {tag}\n"),
        )
    }

    pub fn write_raw(&self, file: &str, body: &str) -> PathBuf {
        let path = self.path(file);
        std::fs::write(&path, body).unwrap();
        path
    }

    pub fn builds(&self, exported: &str) -> usize {
        self.builds.get(exported).map(|c| *c).unwrap_or(0)
    }

    pub async fn container(&self) -> Container {
        let store = DescriptorStore::discover(self.dir.path(), self.loader.as_ref())
            .await
            .unwrap();
        Container::new(store)
    }

    pub fn supervisor(&self, container: &Container) -> ReloadSupervisor {
        ReloadSupervisor::new(
            container.clone(),
            self.loader.clone(),
            ReloadOptions {
                debounce: std::time::Duration::ZERO,
            },
        )
    }

    /// Canonical path of `file`, as stored on descriptors and reported by the watcher.
    pub fn source(&self, file: &str) -> PathBuf {
        canonical(&self.path(file))
    }
}

pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap()
}
