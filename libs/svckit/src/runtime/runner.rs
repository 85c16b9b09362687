//! Host lifecycle for a services directory.
//!
//! Phase order: **discover → validate → resolve all → watch → wait → stop**.
//! A failure before the wait phase aborts the run; after that, reload
//! failures are logged and the previous instances keep serving.

use std::path::PathBuf;
use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::container::Container;
use crate::definition::DefinitionLoader;
use crate::graph;
use crate::reload::{ReloadOptions, ReloadSupervisor};
use crate::startup;
use crate::store::DescriptorStore;

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, we initiate shutdown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    /// Directory holding one definition file per service.
    pub services_dir: PathBuf,
    /// Turns a definition file into a service definition.
    pub loader: Arc<dyn DefinitionLoader>,
    /// Watch `services_dir` and reload changed services.
    pub hot_reload: bool,
    pub reload: ReloadOptions,
    pub shutdown: ShutdownOptions,
}

/// Discover and validate without constructing anything.
pub async fn check(
    services_dir: impl Into<PathBuf>,
    loader: &dyn DefinitionLoader,
) -> anyhow::Result<DescriptorStore> {
    let dir = services_dir.into();
    let store = DescriptorStore::discover(&dir, loader)
        .await
        .with_context(|| format!("service discovery in {}", dir.display()))?;
    graph::validate(&store)?;
    Ok(store)
}

/// Full cycle: discover → validate → resolve all → watch → wait → stop.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                match svckit_bootstrap::wait_for_shutdown().await {
                    Ok(()) => tracing::info!("shutdown: signal received"),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "shutdown: primary waiter failed; falling back to ctrl_c()"
                        );
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let store = check(&opts.services_dir, opts.loader.as_ref()).await?;
    let container = Container::new(store);

    if let Err(e) = startup::resolve_all(&container).await {
        tracing::error!(error = %e, "Startup resolution failed");
        container.shutdown().await;
        return Err(e.into());
    }

    let watcher = if opts.hot_reload {
        let supervisor = Arc::new(ReloadSupervisor::new(
            container.clone(),
            Arc::clone(&opts.loader),
            opts.reload,
        ));
        Some(supervisor.watch(&opts.services_dir, cancel.child_token())?)
    } else {
        tracing::info!("Hot reload disabled");
        None
    };

    cancel.cancelled().await;
    tracing::info!("Stopping services");

    if let Some(handle) = watcher {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Service watcher task ended abnormally");
        }
    }
    container.shutdown().await;
    tracing::info!("All services released");
    Ok(())
}
