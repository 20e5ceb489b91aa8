use crate::domain::{Backend, ContainerRuntime};
use crate::error::{RuntimeError, SelectError};
use crate::services::events::{EventSink, SidecarEvent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Opens live-probed engine connections.
#[async_trait]
pub trait RuntimeConnector: Send + Sync {
    async fn docker(&self) -> Result<Box<dyn ContainerRuntime>, RuntimeError>;

    async fn containerd(
        &self,
        address: &Path,
        namespace: &str,
    ) -> Result<Box<dyn ContainerRuntime>, RuntimeError>;
}

/// Which engines may be tried, and where containerd listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOptions {
    pub containerd_only: bool,
    pub containerd_address: PathBuf,
    pub containerd_namespace: String,
}

/// Connects to Docker, falling back to containerd.
///
/// Docker is skipped entirely when `containerd_only` is set. A failed
/// attempt is reported to the sink and only becomes an error once both
/// engines have failed.
pub async fn select_runtime(
    options: &SelectorOptions,
    connector: &dyn RuntimeConnector,
    sink: &dyn EventSink,
) -> Result<Box<dyn ContainerRuntime>, SelectError> {
    let mut docker_error = String::from("not tried");

    if !options.containerd_only {
        match connector.docker().await {
            Ok(runtime) => {
                sink.emit(SidecarEvent::Connected {
                    backend: Backend::Docker,
                });
                return Ok(runtime);
            }
            Err(err) => {
                docker_error = err.to_string();
                sink.emit(SidecarEvent::ConnectFailed {
                    backend: Backend::Docker,
                    error: docker_error.clone(),
                });
            }
        }
    }

    match connector
        .containerd(&options.containerd_address, &options.containerd_namespace)
        .await
    {
        Ok(runtime) => {
            sink.emit(SidecarEvent::Connected {
                backend: Backend::Containerd,
            });
            Ok(runtime)
        }
        Err(err) => {
            sink.emit(SidecarEvent::ConnectFailed {
                backend: Backend::Containerd,
                error: err.to_string(),
            });
            Err(SelectError::NoRuntimeAvailable {
                docker: docker_error,
                containerd: err.to_string(),
            })
        }
    }
}
