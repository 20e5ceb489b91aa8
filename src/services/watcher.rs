use crate::domain::{Backend, ContainerRuntime, PodIdentity, SidecarMarker, WorkContainer, WorkSet};
use crate::error::{DiscoveryError, WaitError};
use crate::services::aggregate::ExitCodeAggregate;
use crate::services::discovery::{Discovery, classify};
use crate::services::events::{EventSink, SidecarEvent};
use futures::future::join_all;
use std::sync::Arc;

/// How the work set is waited on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitMode {
    /// One container at a time, in work set order.
    #[default]
    Sequential,
    /// All containers at once; codes are still folded in work set order.
    Parallel,
}

/// Discovers a pod's workload on one engine and waits for it to finish.
///
/// Owns the engine connection; it is released by [`SidecarWatcher::close`]
/// or, at the latest, on drop.
pub struct SidecarWatcher {
    runtime: Box<dyn ContainerRuntime>,
    sink: Arc<dyn EventSink>,
    mode: WaitMode,
    discovery: Option<Discovery>,
}

impl SidecarWatcher {
    pub fn new(runtime: Box<dyn ContainerRuntime>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            runtime,
            sink,
            mode: WaitMode::default(),
            discovery: None,
        }
    }

    pub fn with_mode(mut self, mode: WaitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn backend(&self) -> Backend {
        self.runtime.backend()
    }

    /// Classifies the pod's containers and keeps the work set for [`Self::wait`].
    pub async fn list(&mut self, pod: &PodIdentity, prefix: &str) -> Result<(), DiscoveryError> {
        let records = self.runtime.list_pod_containers(pod).await?;
        let discovery = classify(
            records,
            pod,
            self.runtime.labels(),
            prefix,
            self.sink.as_ref(),
        )?;
        self.discovery = Some(discovery);
        Ok(())
    }

    pub fn work_set(&self) -> Option<&WorkSet> {
        self.discovery.as_ref().map(|d| &d.work_set)
    }

    pub fn marker(&self) -> Option<&SidecarMarker> {
        self.discovery.as_ref().map(|d| &d.marker)
    }

    /// Waits for every container of the work set and returns the aggregate
    /// exit code. Containers that can not be inspected or waited on are
    /// reported and left out of the aggregate.
    pub async fn wait(&self) -> Result<i64, WaitError> {
        let work_set = self.work_set().ok_or(WaitError::NotDiscovered)?;

        let aggregate = match self.mode {
            WaitMode::Sequential => {
                let mut aggregate = ExitCodeAggregate::new();
                for container in work_set {
                    if let Some(code) = self.wait_one(container).await {
                        aggregate.observe(code);
                    }
                }
                aggregate
            }
            WaitMode::Parallel => join_all(work_set.iter().map(|c| self.wait_one(c)))
                .await
                .into_iter()
                .flatten()
                .collect(),
        };

        Ok(aggregate.code())
    }

    async fn wait_one(&self, container: &WorkContainer) -> Option<i64> {
        let inspection = match self.runtime.inspect(&container.id).await {
            Ok(inspection) => inspection,
            Err(err) => {
                self.sink.emit(SidecarEvent::InspectFailed {
                    id: container.id.clone(),
                    name: container.name.clone(),
                    error: err.to_string(),
                });
                return None;
            }
        };

        if inspection.status.is_terminal() {
            self.sink.emit(SidecarEvent::AlreadyExited {
                id: container.id.clone(),
                name: container.name.clone(),
                status: inspection.status,
                exit_code: inspection.exit_code,
            });
            return Some(inspection.exit_code);
        }

        self.sink.emit(SidecarEvent::WaitStarted {
            id: container.id.clone(),
            name: container.name.clone(),
            status: inspection.status,
        });

        match self.runtime.wait_next_exit(&container.id).await {
            Ok(code) => {
                self.sink.emit(SidecarEvent::WaitFinished {
                    id: container.id.clone(),
                    name: container.name.clone(),
                    status: self.runtime.backend().exited_status(),
                    exit_code: code,
                });
                Some(code)
            }
            Err(err) => {
                self.sink.emit(SidecarEvent::WaitFailed {
                    id: container.id.clone(),
                    name: container.name.clone(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// Releases the engine connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.runtime.close();
    }
}

impl Drop for SidecarWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContainerStatus, DOCKER_LABELS};
    use crate::test_support::{MockRuntime, RecordingSink, pod_container};
    use std::time::Duration;

    const PREFIX: &str = "ti-cosfs-";

    fn pod() -> PodIdentity {
        PodIdentity::new("default", "train-0").unwrap()
    }

    /// Marker plus one running workload container per exit code.
    fn runtime_with_exits(codes: &[i64]) -> MockRuntime {
        let mock = MockRuntime::new(Backend::Docker);
        mock.add_container(pod_container(&DOCKER_LABELS, &pod(), "m", "ti-cosfs-fs", 5));
        for (idx, code) in codes.iter().enumerate() {
            let id = format!("c{idx}");
            mock.add_container(pod_container(
                &DOCKER_LABELS,
                &pod(),
                &id,
                &format!("app{idx}"),
                10 + idx as i64,
            ));
            mock.set_exit(&id, *code);
        }
        mock
    }

    async fn aggregate(codes: &[i64], mode: WaitMode) -> i64 {
        let sink = Arc::new(RecordingSink::new());
        let mut watcher =
            SidecarWatcher::new(Box::new(runtime_with_exits(codes)), sink).with_mode(mode);
        watcher.list(&pod(), PREFIX).await.unwrap();
        watcher.wait().await.unwrap()
    }

    #[tokio::test]
    async fn test_aggregation_law() {
        for mode in [WaitMode::Sequential, WaitMode::Parallel] {
            assert_eq!(aggregate(&[0, 0, 0], mode).await, 0);
            assert_eq!(aggregate(&[0, 2, 0], mode).await, 2);
            assert_eq!(aggregate(&[3, 0, 5], mode).await, 5);
            assert_eq!(aggregate(&[7, 0, 0], mode).await, 7);
        }
    }

    #[tokio::test]
    async fn test_wait_before_list_is_an_error() {
        let watcher = SidecarWatcher::new(
            Box::new(MockRuntime::new(Backend::Docker)),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(watcher.wait().await, Err(WaitError::NotDiscovered)));
    }

    #[tokio::test]
    async fn test_exited_container_is_not_waited_on() {
        let mock = runtime_with_exits(&[0, 0]);
        mock.set_status("c0", ContainerStatus::Exited, 4);
        let handle = mock.clone();

        let sink = Arc::new(RecordingSink::new());
        let mut watcher = SidecarWatcher::new(Box::new(mock), sink.clone());
        watcher.list(&pod(), PREFIX).await.unwrap();

        assert_eq!(watcher.wait().await.unwrap(), 4);
        let commands = handle.get_commands();
        assert!(!commands.contains(&"wait:c0".to_string()));
        assert!(commands.contains(&"wait:c1".to_string()));
        assert!(sink.events().iter().any(|e| matches!(
            e,
            SidecarEvent::AlreadyExited { id, status: ContainerStatus::Exited, exit_code: 4, .. } if id == "c0"
        )));
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_fatal() {
        let mock = runtime_with_exits(&[9, 3, 0]);
        mock.fail_inspect("c0");
        mock.fail_wait("c1");
        let handle = mock.clone();

        let sink = Arc::new(RecordingSink::new());
        let mut watcher = SidecarWatcher::new(Box::new(mock), sink.clone());
        watcher.list(&pod(), PREFIX).await.unwrap();

        assert_eq!(watcher.wait().await.unwrap(), 0);
        assert!(handle.get_commands().contains(&"wait:c2".to_string()));

        let events = sink.events();
        assert!(events.iter().any(|e| matches!(e, SidecarEvent::InspectFailed { id, .. } if id == "c0")));
        assert!(events.iter().any(|e| matches!(e, SidecarEvent::WaitFailed { id, .. } if id == "c1")));
    }

    #[tokio::test]
    async fn test_wait_finished_carries_exited_status() {
        for backend in [Backend::Docker, Backend::Containerd] {
            let mock = MockRuntime::new(backend);
            let scheme = backend.labels();
            mock.add_container(pod_container(scheme, &pod(), "m", "ti-cosfs-fs", 5));
            mock.add_container(pod_container(scheme, &pod(), "c0", "app", 10));
            mock.set_exit("c0", 3);

            let sink = Arc::new(RecordingSink::new());
            let mut watcher = SidecarWatcher::new(Box::new(mock), sink.clone());
            watcher.list(&pod(), PREFIX).await.unwrap();
            watcher.wait().await.unwrap();

            let expected = backend.exited_status();
            assert!(sink.events().iter().any(|e| matches!(
                e,
                SidecarEvent::WaitFinished { id, status, exit_code: 3, .. }
                    if id == "c0" && *status == expected
            )));
        }
    }

    #[tokio::test]
    async fn test_sequential_waits_in_work_set_order() {
        let mock = runtime_with_exits(&[0, 0, 0]);
        let handle = mock.clone();

        let mut watcher = SidecarWatcher::new(Box::new(mock), Arc::new(RecordingSink::new()));
        watcher.list(&pod(), PREFIX).await.unwrap();
        watcher.wait().await.unwrap();

        let waits: Vec<String> = handle
            .get_commands()
            .into_iter()
            .filter(|c| c.starts_with("inspect:") || c.starts_with("wait:"))
            .collect();
        assert_eq!(
            waits,
            vec![
                "inspect:c0", "wait:c0", "inspect:c1", "wait:c1", "inspect:c2", "wait:c2"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_latency_is_the_sum() {
        let mock = runtime_with_exits(&[0, 0]);
        mock.set_wait_delay("c0", Duration::from_secs(3));
        mock.set_wait_delay("c1", Duration::from_secs(5));

        let mut watcher = SidecarWatcher::new(Box::new(mock), Arc::new(RecordingSink::new()));
        watcher.list(&pod(), PREFIX).await.unwrap();

        let start = tokio::time::Instant::now();
        watcher.wait().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_latency_is_the_max() {
        let mock = runtime_with_exits(&[1, 2]);
        mock.set_wait_delay("c0", Duration::from_secs(5));
        mock.set_wait_delay("c1", Duration::from_secs(3));

        let mut watcher = SidecarWatcher::new(Box::new(mock), Arc::new(RecordingSink::new()))
            .with_mode(WaitMode::Parallel);
        watcher.list(&pod(), PREFIX).await.unwrap();

        let start = tokio::time::Instant::now();
        // c1 finishes first, but folding follows work set order
        assert_eq!(watcher.wait().await.unwrap(), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mock = MockRuntime::new(Backend::Containerd);
        let handle = mock.clone();

        let mut watcher = SidecarWatcher::new(Box::new(mock), Arc::new(RecordingSink::new()));
        watcher.close();
        watcher.close();
        drop(watcher);

        assert_eq!(handle.close_count(), 3);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_list_error_is_propagated() {
        let mock = MockRuntime::new(Backend::Docker);
        mock.set_fail_on("list");

        let mut watcher = SidecarWatcher::new(Box::new(mock), Arc::new(RecordingSink::new()));
        let result = watcher.list(&pod(), PREFIX).await;
        assert!(matches!(result, Err(DiscoveryError::List(_))));
        assert!(watcher.work_set().is_none());
    }
}
