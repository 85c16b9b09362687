use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::definition::DefinitionLoader;
use crate::descriptor::ServiceDescriptor;
use crate::error::{shared, ContainerError};

/// Catalog of known services. Filled once at startup, read-only afterwards;
/// only descriptor state changes after that.
#[derive(Default)]
pub struct DescriptorStore {
    descriptors: Vec<Arc<ServiceDescriptor>>, // registration order
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for DescriptorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.descriptors.iter().map(|d| d.name()).collect();
        f.debug_struct("DescriptorStore")
            .field("services", &names)
            .finish()
    }
}

impl DescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ServiceDescriptor) -> Result<(), ContainerError> {
        if self.index.contains_key(descriptor.name()) {
            return Err(ContainerError::DuplicateService(descriptor.name().to_owned()));
        }
        self.index
            .insert(descriptor.name().to_owned(), self.descriptors.len());
        self.descriptors.push(Arc::new(descriptor));
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Descriptor loaded from `source`, if any.
    pub fn find_by_source(&self, source: &Path) -> Option<&Arc<ServiceDescriptor>> {
        self.descriptors.iter().find(|d| d.source() == source)
    }

    /// All descriptors in registration order.
    pub fn all(&self) -> &[Arc<ServiceDescriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Scan `dir` and register one descriptor per definition file.
    ///
    /// The directory is canonicalised so descriptor sources line up with the
    /// paths reported by the file watcher. Entries are taken in file-name
    /// order; sub-directories and hidden files are skipped.
    pub async fn discover(
        dir: impl AsRef<Path>,
        loader: &dyn DefinitionLoader,
    ) -> Result<Self, ContainerError> {
        let dir = dir.as_ref();
        let discovery = |e: std::io::Error| ContainerError::Discovery {
            path: dir.to_path_buf(),
            source: Arc::new(e),
        };

        let root = tokio::fs::canonicalize(dir).await.map_err(discovery)?;
        let mut sources: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(&root).await.map_err(discovery)?;
        while let Some(entry) = entries.next_entry().await.map_err(discovery)? {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_file = entry.file_type().await.map_err(discovery)?.is_file();
            if is_file && !hidden {
                sources.push(entry.path());
            }
        }
        sources.sort();

        let mut store = Self::new();
        for source in sources {
            let definition =
                loader
                    .load(&source)
                    .await
                    .map_err(|e| ContainerError::LoadFailure {
                        path: source.clone(),
                        source: shared(e),
                    })?;
            let descriptor = ServiceDescriptor::new(source, definition);
            tracing::debug!(
                service = descriptor.name(),
                source = %descriptor.source().display(),
                deps = ?descriptor.dependencies(),
                "Service discovered"
            );
            store.register(descriptor)?;
        }

        tracing::info!(
            services = ?store.all().iter().map(|d| d.name()).collect::<Vec<_>>(),
            dir = %root.display(),
            "Service discovery complete"
        );
        Ok(store)
    }
}
