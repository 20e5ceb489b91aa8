use crate::domain::{
    Backend, ContainerRecord, ContainerRuntime, ContainerStatus, Inspection, LabelScheme,
    PodIdentity,
};
use crate::error::RuntimeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use containerd_client::services::v1::containers_client::ContainersClient;
use containerd_client::services::v1::tasks_client::TasksClient;
use containerd_client::services::v1::version_client::VersionClient;
use containerd_client::services::v1::{Container, GetRequest, ListContainersRequest, WaitRequest};
use containerd_client::types::v1::Status;
use std::fmt;
use std::path::{Path, PathBuf};
use tonic::Request;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Channel;
use tracing::{debug, warn};

const BACKEND: Backend = Backend::Containerd;
const NAMESPACE_HEADER: &str = "containerd-namespace";

/// containerd gRPC API over its unix socket.
pub struct ContainerdAdapter {
    channel: Option<Channel>,
    address: PathBuf,
    namespace: AsciiMetadataValue,
}

impl ContainerdAdapter {
    /// Connects to `address` and asks for the daemon version.
    pub async fn connect(address: &Path, namespace: &str) -> Result<Self, RuntimeError> {
        let namespace = AsciiMetadataValue::try_from(namespace).map_err(|e| {
            RuntimeError::Connection {
                backend: BACKEND,
                reason: format!("invalid namespace '{namespace}': {e}"),
            }
        })?;

        let channel = containerd_client::connect(address)
            .await
            .map_err(|e| RuntimeError::Connection {
                backend: BACKEND,
                reason: format!("no containerd server at {}: {e}", address.display()),
            })?;

        let adapter = Self {
            channel: Some(channel.clone()),
            address: address.to_path_buf(),
            namespace,
        };

        let version = VersionClient::new(channel)
            .version(adapter.request(()))
            .await
            .map_err(|e| RuntimeError::Connection {
                backend: BACKEND,
                reason: format!("get containerd version: {e}"),
            })?
            .into_inner();

        debug!(version = %version.version, revision = %version.revision, "containerd answered");
        Ok(adapter)
    }

    fn channel(&self) -> Result<Channel, RuntimeError> {
        self.channel
            .clone()
            .ok_or(RuntimeError::Closed { backend: BACKEND })
    }

    /// Wraps a message with the namespace header every containerd call needs.
    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request
            .metadata_mut()
            .insert(NAMESPACE_HEADER, self.namespace.clone());
        request
    }
}

impl fmt::Debug for ContainerdAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerdAdapter")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("connected", &self.channel.is_some())
            .finish()
    }
}

#[async_trait]
impl ContainerRuntime for ContainerdAdapter {
    fn backend(&self) -> Backend {
        BACKEND
    }

    async fn list_pod_containers(
        &self,
        pod: &PodIdentity,
    ) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let response = ContainersClient::new(self.channel()?)
            .list(self.request(ListContainersRequest {
                filters: list_filters(pod, self.labels()),
            }))
            .await
            .map_err(|e| RuntimeError::request(BACKEND, "list containers", e))?;

        Ok(response
            .into_inner()
            .containers
            .into_iter()
            .map(to_record)
            .collect())
    }

    async fn inspect(&self, id: &str) -> Result<Inspection, RuntimeError> {
        let response = TasksClient::new(self.channel()?)
            .get(self.request(GetRequest {
                container_id: id.to_string(),
                exec_id: String::new(),
            }))
            .await
            .map_err(|e| RuntimeError::request(BACKEND, "get task", e))?;

        let process = response
            .into_inner()
            .process
            .ok_or_else(|| RuntimeError::MissingData {
                backend: BACKEND,
                what: "task",
                id: id.to_string(),
            })?;

        Ok(Inspection {
            status: map_status(process.status()),
            exit_code: i64::from(process.exit_status),
        })
    }

    async fn wait_next_exit(&self, id: &str) -> Result<i64, RuntimeError> {
        let response = TasksClient::new(self.channel()?)
            .wait(self.request(WaitRequest {
                container_id: id.to_string(),
                exec_id: String::new(),
            }))
            .await
            .map_err(|e| RuntimeError::request(BACKEND, "wait task", e))?;

        Ok(i64::from(response.into_inner().exit_status))
    }

    fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!(address = %self.address.display(), "containerd channel released");
        }
    }
}

/// One filter with both pod labels; comma-joined fields are ANDed.
fn list_filters(pod: &PodIdentity, labels: &LabelScheme) -> Vec<String> {
    vec![format!(
        "labels.\"{}\"=={},labels.\"{}\"=={}",
        labels.pod_namespace, pod.namespace, labels.pod_name, pod.name
    )]
}

fn to_record(container: Container) -> ContainerRecord {
    let created = container
        .created_at
        .and_then(|at| DateTime::from_timestamp(at.seconds, u32::try_from(at.nanos).unwrap_or(0)))
        .unwrap_or_else(|| {
            warn!(containerid = %container.id, "containerd reported no creation time");
            DateTime::<Utc>::UNIX_EPOCH
        });

    ContainerRecord {
        id: container.id,
        created,
        labels: container.labels,
    }
}

fn map_status(status: Status) -> ContainerStatus {
    match status {
        Status::Created => ContainerStatus::Created,
        Status::Running => ContainerStatus::Running,
        Status::Stopped => ContainerStatus::Stopped,
        Status::Paused | Status::Pausing => ContainerStatus::Paused,
        Status::Unknown => ContainerStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CONTAINERD_LABELS;
    use std::collections::HashMap;

    #[test]
    fn test_only_stopped_is_terminal() {
        assert!(map_status(Status::Stopped).is_terminal());
        assert!(!map_status(Status::Running).is_terminal());
        assert!(!map_status(Status::Created).is_terminal());
        assert!(!map_status(Status::Pausing).is_terminal());
        assert!(!map_status(Status::Unknown).is_terminal());
    }

    #[test]
    fn test_container_to_record_keeps_sub_second_precision() {
        let container = Container {
            id: "ctr".into(),
            labels: HashMap::from([("k".to_string(), "v".to_string())]),
            created_at: Some(prost_types::Timestamp {
                seconds: 1_700_000_000,
                nanos: 250_000_000,
            }),
            ..Default::default()
        };

        let record = to_record(container);
        assert_eq!(record.id, "ctr");
        assert_eq!(record.created.timestamp_subsec_millis(), 250);
        assert_eq!(record.label("k"), Some("v"));
    }

    #[test]
    fn test_container_without_timestamp_sorts_first() {
        let record = to_record(Container {
            id: "ctr".into(),
            ..Default::default()
        });
        assert_eq!(record.created, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_list_filters() {
        let pod = PodIdentity::new("ml", "train-0").unwrap();
        assert_eq!(
            list_filters(&pod, &CONTAINERD_LABELS),
            vec![
                r#"labels."io.kubernetes.pod.namespace"==ml,labels."io.kubernetes.pod.name"==train-0"#
                    .to_string()
            ]
        );
    }
}
