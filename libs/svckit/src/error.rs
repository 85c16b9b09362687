use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Cause attached to a [`ContainerError`]. Shared so that one failed
/// resolution can be handed to every waiter of the same single-flight.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Wrap a collaborator error (factories and loaders speak `anyhow`).
pub fn shared(err: anyhow::Error) -> SharedError {
    Arc::from(Box::<dyn std::error::Error + Send + Sync + 'static>::from(err))
}

/// Structured errors for the service container.
#[derive(Debug, Clone, Error)]
pub enum ContainerError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{0}' is already registered")]
    DuplicateService(String),

    #[error("factory '{0}' is exported more than once")]
    DuplicateFactory(String),

    #[error("cyclic dependency found when resolving '{root}' and '{service}'")]
    CyclicDependency { root: String, service: String },

    #[error("construction failed for service '{service}'")]
    ConstructionFailure {
        service: String,
        #[source]
        source: SharedError,
    },

    #[error("reload failed for service '{service}'")]
    ReloadFailure {
        service: String,
        #[source]
        source: SharedError,
    },

    #[error("failed to load service definition from '{}'", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: SharedError,
    },

    #[error("failed to scan service directory '{}'", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: SharedError,
    },

    #[error("service '{service}' is not a {expected}")]
    TypeMismatch {
        service: String,
        expected: &'static str,
    },
}

impl ContainerError {
    /// Name of the service the error is about, when there is one.
    pub fn service(&self) -> Option<&str> {
        match self {
            ContainerError::UnknownService(name) | ContainerError::DuplicateService(name) => {
                Some(name)
            }
            ContainerError::CyclicDependency { root, .. } => Some(root),
            ContainerError::ConstructionFailure { service, .. }
            | ContainerError::ReloadFailure { service, .. }
            | ContainerError::TypeMismatch { service, .. } => Some(service),
            ContainerError::DuplicateFactory(_)
            | ContainerError::LoadFailure { .. }
            | ContainerError::Discovery { .. } => None,
        }
    }
}

pub type Result<T, E = ContainerError> = std::result::Result<T, E>;
