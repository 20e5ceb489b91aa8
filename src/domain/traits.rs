use super::{Backend, ContainerRecord, Inspection, LabelScheme, PodIdentity};
use crate::error::RuntimeError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for the container engine operations the helper needs
#[async_trait]
pub trait ContainerRuntime: Send + Sync + Debug {
    /// Which engine this is
    fn backend(&self) -> Backend;

    /// Label keys used by this engine
    fn labels(&self) -> &LabelScheme {
        self.backend().labels()
    }

    /// List every container the engine attributes to the pod, in engine order
    async fn list_pod_containers(
        &self,
        pod: &PodIdentity,
    ) -> Result<Vec<ContainerRecord>, RuntimeError>;

    /// Read the current state of a container
    async fn inspect(&self, id: &str) -> Result<Inspection, RuntimeError>;

    /// Block until the container's next exit and return its code
    async fn wait_next_exit(&self, id: &str) -> Result<i64, RuntimeError>;

    /// Release the connection. Calling it again is a no-op.
    fn close(&mut self);
}
