use crate::domain::ContainerRuntime;
use crate::error::RuntimeError;
use crate::infra::{ContainerdAdapter, DockerAdapter};
use crate::services::RuntimeConnector;
use async_trait::async_trait;
use std::path::Path;

/// Connects to the real engines on this node.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineConnector;

#[async_trait]
impl RuntimeConnector for EngineConnector {
    async fn docker(&self) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
        let adapter = DockerAdapter::connect().await?;
        Ok(Box::new(adapter))
    }

    async fn containerd(
        &self,
        address: &Path,
        namespace: &str,
    ) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
        let adapter = ContainerdAdapter::connect(address, namespace).await?;
        Ok(Box::new(adapter))
    }
}
