//! Hot reload of service definitions.
//!
//! One change notification runs through: debounce → impact set → per-service
//! reload transaction with rollback. Notifications are handled one at a
//! time; a failed reload leaves the previous instance live.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::container::Container;
use crate::definition::DefinitionLoader;
use crate::descriptor::ServiceDescriptor;
use crate::error::{shared, ContainerError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ReloadOptions {
    /// A service (re)instantiated more recently than this is not reloaded.
    pub debounce: Duration,
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Outcome of one change notification.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub reloaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, ContainerError)>,
}

impl ReloadReport {
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

pub struct ReloadSupervisor {
    container: Container,
    loader: Arc<dyn DefinitionLoader>,
    options: ReloadOptions,
}

impl ReloadSupervisor {
    pub fn new(
        container: Container,
        loader: Arc<dyn DefinitionLoader>,
        options: ReloadOptions,
    ) -> Self {
        Self {
            container,
            loader,
            options,
        }
    }

    /// Handle a change of the file at `path`.
    pub async fn on_change(&self, path: &Path) -> ReloadReport {
        let mut report = ReloadReport::default();

        let Some(changed) = self.container.store().find_by_source(path).cloned() else {
            tracing::trace!(path = %path.display(), "Change outside known services ignored");
            return report;
        };

        if changed.reloaded_within(self.options.debounce, Instant::now()) {
            tracing::debug!(service = changed.name(), "Reload debounced");
            report.skipped.push(changed.name().to_owned());
            return report;
        }

        tracing::info!(service = changed.name(), path = %path.display(), "Reloading");

        for (pos, d) in self.impact_set(&changed).into_iter().enumerate() {
            if d.reloaded_within(self.options.debounce, Instant::now()) {
                tracing::debug!(service = d.name(), "Reload debounced");
                report.skipped.push(d.name().to_owned());
                continue;
            }

            match self.reload(&d).await {
                Ok(()) => report.reloaded.push(d.name().to_owned()),
                Err(e) => {
                    tracing::warn!(service = d.name(), error = %e, "Failed to reload service");
                    report.failed.push((d.name().to_owned(), e));
                    if pos == 0 {
                        // Dependents keep the instances they were built against.
                        break;
                    }
                }
            }
        }

        report
    }

    /// `[changed] + direct dependents`, dependents in reverse registration
    /// order.
    pub fn impact_set(&self, changed: &Arc<ServiceDescriptor>) -> Vec<Arc<ServiceDescriptor>> {
        let mut affected: Vec<Arc<ServiceDescriptor>> = self
            .container
            .store()
            .all()
            .iter()
            .filter(|d| d.depends_on(changed.name()))
            .cloned()
            .collect();
        affected.push(Arc::clone(changed));
        affected.reverse();
        affected
    }

    /// Reload transaction for one descriptor. On any failure the descriptor
    /// is restored to exactly its prior definition and instance.
    async fn reload(&self, d: &Arc<ServiceDescriptor>) -> Result<(), ContainerError> {
        let snapshot = d.snapshot();

        let definition = match self.loader.load(d.source()).await {
            Ok(definition) => definition,
            Err(e) => {
                return Err(ContainerError::ReloadFailure {
                    service: d.name().to_owned(),
                    source: shared(e.context(format!("reloading {}", d.source().display()))),
                })
            }
        };

        let declared: Vec<String> = definition
            .factory
            .dependencies()
            .iter()
            .map(|n| crate::descriptor::service_name(n))
            .collect();
        if declared != d.dependencies() {
            tracing::warn!(
                service = d.name(),
                declared = ?declared,
                kept = ?d.dependencies(),
                "Reloaded definition declares different dependencies; keeping the list from discovery"
            );
        }

        d.replace_definition(definition);

        if let Some(old) = d.take_instance() {
            if let Err(e) = old.release().await {
                tracing::warn!(service = d.name(), error = %e, "Release hook failed");
            }
        }

        match self.container.resolve(d.name()).await {
            Ok(_) => Ok(()),
            Err(e) => {
                d.restore(snapshot);
                Err(ContainerError::ReloadFailure {
                    service: d.name().to_owned(),
                    source: Arc::new(e),
                })
            }
        }
    }

    /// Watch `dir` and feed modify/create events to [`on_change`](Self::on_change)
    /// until `cancel` fires. The watcher lives inside the returned task.
    pub fn watch(
        self: Arc<Self>,
        dir: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> anyhow::Result<JoinHandle<()>> {
        let dir = std::fs::canonicalize(dir.as_ref())?;
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Service watcher error"),
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = %dir.display(), "Watching service definitions");

        Ok(tokio::spawn(async move {
            let _watcher = watcher;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(path) => {
                            let report = self.on_change(&path).await;
                            if !report.failed.is_empty() {
                                tracing::warn!(
                                    failed = ?report.failed.iter().map(|(n, _)| n).collect::<Vec<_>>(),
                                    reloaded = ?report.reloaded,
                                    "Reload finished with failures"
                                );
                            }
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!("Service watcher stopped");
        }))
    }
}
