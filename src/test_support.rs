use crate::domain::{
    Backend, ContainerRecord, ContainerRuntime, ContainerStatus, Inspection, LabelScheme,
    PodIdentity,
};
use crate::error::RuntimeError;
use crate::services::{EventSink, RuntimeConnector, SidecarEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Timestamp `secs` seconds after the epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// An ordinary container of `pod`, labelled the way `scheme` expects.
pub fn pod_container(
    scheme: &LabelScheme,
    pod: &PodIdentity,
    id: &str,
    name: &str,
    created: i64,
) -> ContainerRecord {
    ContainerRecord::new(id, ts(created))
        .with_label(scheme.pod_namespace, pod.namespace.as_str())
        .with_label(scheme.pod_name, pod.name.as_str())
        .with_label(scheme.container_name, name)
        .with_label(scheme.kind, scheme.workload_kind)
}

/// Same as [`pod_container`] but with a non-workload kind.
pub fn sandbox_container(
    scheme: &LabelScheme,
    pod: &PodIdentity,
    id: &str,
    name: &str,
    created: i64,
    kind: &str,
) -> ContainerRecord {
    pod_container(scheme, pod, id, name, created).with_label(scheme.kind, kind)
}

#[derive(Debug, Default)]
struct MockState {
    containers: Vec<ContainerRecord>,
    statuses: HashMap<String, Inspection>,
    exits: HashMap<String, i64>,
    delays: HashMap<String, Duration>,
    fail_on: HashSet<String>,
    commands: Vec<String>,
    close_count: usize,
    closed: bool,
}

/// In-memory engine. Clones share state, so a test can keep a handle
/// after boxing one into a watcher.
#[derive(Debug, Clone)]
pub struct MockRuntime {
    backend: Backend,
    state: Arc<RwLock<MockState>>,
}

impl MockRuntime {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(MockState::default())),
        }
    }

    pub fn add_container(&self, record: ContainerRecord) {
        self.state.write().unwrap().containers.push(record);
    }

    /// Containers default to running and exit with 0 once waited on.
    pub fn set_exit(&self, id: &str, code: i64) {
        self.state.write().unwrap().exits.insert(id.to_string(), code);
    }

    pub fn set_status(&self, id: &str, status: ContainerStatus, exit_code: i64) {
        self.state
            .write()
            .unwrap()
            .statuses
            .insert(id.to_string(), Inspection { status, exit_code });
    }

    pub fn set_wait_delay(&self, id: &str, delay: Duration) {
        self.state
            .write()
            .unwrap()
            .delays
            .insert(id.to_string(), delay);
    }

    pub fn set_fail_on(&self, operation: &str) {
        self.state
            .write()
            .unwrap()
            .fail_on
            .insert(operation.to_string());
    }

    pub fn fail_inspect(&self, id: &str) {
        self.set_fail_on(&format!("inspect:{id}"));
    }

    pub fn fail_wait(&self, id: &str) {
        self.set_fail_on(&format!("wait:{id}"));
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.state.read().unwrap().commands.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.read().unwrap().close_count
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().unwrap().closed
    }

    fn record_command(&self, cmd: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.write().unwrap();
        state.commands.push(cmd.to_string());

        if state.closed {
            return Err(RuntimeError::Closed {
                backend: self.backend,
            });
        }

        let operation = cmd.split(':').next().unwrap_or(cmd);
        if state.fail_on.contains(cmd) || state.fail_on.contains(operation) {
            return Err(RuntimeError::request(
                self.backend,
                "mock",
                format!("mock failure on: {cmd}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn list_pod_containers(
        &self,
        pod: &PodIdentity,
    ) -> Result<Vec<ContainerRecord>, RuntimeError> {
        self.record_command(&format!("list:{pod}"))?;
        Ok(self.state.read().unwrap().containers.clone())
    }

    async fn inspect(&self, id: &str) -> Result<Inspection, RuntimeError> {
        self.record_command(&format!("inspect:{id}"))?;
        Ok(self
            .state
            .read()
            .unwrap()
            .statuses
            .get(id)
            .copied()
            .unwrap_or(Inspection {
                status: ContainerStatus::Running,
                exit_code: 0,
            }))
    }

    async fn wait_next_exit(&self, id: &str) -> Result<i64, RuntimeError> {
        self.record_command(&format!("wait:{id}"))?;
        let (delay, code) = {
            let state = self.state.read().unwrap();
            (
                state.delays.get(id).copied(),
                state.exits.get(id).copied().unwrap_or(0),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(code)
    }

    fn close(&mut self) {
        let mut state = self.state.write().unwrap();
        state.close_count += 1;
        state.closed = true;
    }
}

/// Keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SidecarEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SidecarEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SidecarEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Connector whose engines are either reachable or not. Reachable engines
/// hand out clones of the same [`MockRuntime`].
#[derive(Debug)]
pub struct MockConnector {
    docker: Option<MockRuntime>,
    containerd: Option<MockRuntime>,
    attempts: Mutex<Vec<Backend>>,
}

impl MockConnector {
    pub fn new(docker_up: bool, containerd_up: bool) -> Self {
        Self::with_runtimes(
            docker_up.then(|| MockRuntime::new(Backend::Docker)),
            containerd_up.then(|| MockRuntime::new(Backend::Containerd)),
        )
    }

    pub fn with_runtimes(docker: Option<MockRuntime>, containerd: Option<MockRuntime>) -> Self {
        Self {
            docker,
            containerd,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<Backend> {
        self.attempts.lock().unwrap().clone()
    }

    fn attempt(
        &self,
        backend: Backend,
        runtime: &Option<MockRuntime>,
    ) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
        self.attempts.lock().unwrap().push(backend);
        match runtime {
            Some(runtime) => Ok(Box::new(runtime.clone())),
            None => Err(RuntimeError::Connection {
                backend,
                reason: "mock engine is down".into(),
            }),
        }
    }
}

#[async_trait]
impl RuntimeConnector for MockConnector {
    async fn docker(&self) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
        self.attempt(Backend::Docker, &self.docker)
    }

    async fn containerd(
        &self,
        _address: &Path,
        _namespace: &str,
    ) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
        self.attempt(Backend::Containerd, &self.containerd)
    }
}
