use crate::domain::{
    Backend, ContainerRecord, ContainerRuntime, ContainerStatus, Inspection, LabelScheme,
    PodIdentity,
};
use crate::error::RuntimeError;
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{InspectContainerOptions, ListContainersOptions, WaitContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerStateStatusEnum, ContainerSummary, ContainerWaitResponse};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

const BACKEND: Backend = Backend::Docker;

/// Docker Engine API through the local socket (or `DOCKER_HOST`).
pub struct DockerAdapter {
    docker: Option<Docker>,
}

impl DockerAdapter {
    /// Connects, negotiates the API version and pings the daemon.
    pub async fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(connection_error)?;
        let docker = docker.negotiate_version().await.map_err(connection_error)?;
        docker.ping().await.map_err(connection_error)?;

        debug!("docker daemon answered ping");
        Ok(Self {
            docker: Some(docker),
        })
    }

    fn client(&self) -> Result<&Docker, RuntimeError> {
        self.docker
            .as_ref()
            .ok_or(RuntimeError::Closed { backend: BACKEND })
    }
}

impl fmt::Debug for DockerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerAdapter")
            .field("connected", &self.docker.is_some())
            .finish()
    }
}

#[async_trait]
impl ContainerRuntime for DockerAdapter {
    fn backend(&self) -> Backend {
        BACKEND
    }

    async fn list_pod_containers(
        &self,
        pod: &PodIdentity,
    ) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let filters = list_filters(pod, self.labels());

        let summaries = self
            .client()?
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| RuntimeError::request(BACKEND, "list containers", e))?;

        Ok(summaries.into_iter().filter_map(to_record).collect())
    }

    async fn inspect(&self, id: &str) -> Result<Inspection, RuntimeError> {
        let response = self
            .client()?
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| RuntimeError::request(BACKEND, "inspect container", e))?;

        let state = response.state.ok_or_else(|| RuntimeError::MissingData {
            backend: BACKEND,
            what: "state",
            id: id.to_string(),
        })?;

        Ok(Inspection {
            status: map_status(state.status),
            exit_code: state.exit_code.unwrap_or_default(),
        })
    }

    async fn wait_next_exit(&self, id: &str) -> Result<i64, RuntimeError> {
        let options = WaitContainerOptions {
            condition: "next-exit",
        };
        let mut stream = Box::pin(self.client()?.wait_container(id, Some(options)));

        wait_outcome(id, stream.next().await)
    }

    fn close(&mut self) {
        if self.docker.take().is_some() {
            debug!("docker client released");
        }
    }
}

fn connection_error(err: DockerError) -> RuntimeError {
    RuntimeError::Connection {
        backend: BACKEND,
        reason: err.to_string(),
    }
}

/// `label` filters selecting the containers of `pod`.
fn list_filters(pod: &PodIdentity, labels: &LabelScheme) -> HashMap<String, Vec<String>> {
    HashMap::from([(
        "label".to_string(),
        vec![
            format!("{}={}", labels.pod_namespace, pod.namespace),
            format!("{}={}", labels.pod_name, pod.name),
        ],
    )])
}

fn wait_outcome(
    id: &str,
    item: Option<Result<ContainerWaitResponse, DockerError>>,
) -> Result<i64, RuntimeError> {
    match item {
        Some(Ok(response)) => Ok(response.status_code),
        // bollard turns a non-zero exit into an error
        Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
        Some(Err(err)) => Err(RuntimeError::request(BACKEND, "wait container", err)),
        None => Err(RuntimeError::MissingData {
            backend: BACKEND,
            what: "wait status",
            id: id.to_string(),
        }),
    }
}

fn to_record(summary: ContainerSummary) -> Option<ContainerRecord> {
    let Some(id) = summary.id else {
        warn!("docker listed a container without id");
        return None;
    };

    // the list endpoint only reports whole seconds, so a container started
    // in the same second as the sidecar counts as created before it
    let created = summary
        .created
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(|| {
            warn!(containerid = %id, "docker reported no creation time");
            DateTime::<Utc>::UNIX_EPOCH
        });

    Some(ContainerRecord {
        id,
        created,
        labels: summary.labels.unwrap_or_default(),
    })
}

fn map_status(status: Option<ContainerStateStatusEnum>) -> ContainerStatus {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ContainerStatus::Exited,
        Some(ContainerStateStatusEnum::DEAD) => ContainerStatus::Dead,
        _ => ContainerStatus::Unknown,
    }
}
