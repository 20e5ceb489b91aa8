use crate::domain::{Backend, ContainerStatus, SidecarMarker, TIME_FORMAT, WorkContainer};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Why discovery dropped a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoLabels,
    /// Pod labels missing or naming another pod.
    ForeignPod,
    /// Sandbox/pause container, carries the kind label value if any.
    NotWorkload { kind: Option<String> },
    MissingName,
    /// Created at or before the sidecar, i.e. an init container.
    CreatedBeforeMarker {
        created: DateTime<Utc>,
        marker: DateTime<Utc>,
    },
}

/// Everything the engine reports while selecting, discovering and waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidecarEvent {
    Connected {
        backend: Backend,
    },
    ConnectFailed {
        backend: Backend,
        error: String,
    },
    Skipped {
        id: String,
        name: Option<String>,
        reason: SkipReason,
    },
    MarkerFound {
        marker: SidecarMarker,
    },
    /// More than one name matched the prefix; `current` replaces `previous`.
    MarkerReplaced {
        previous: SidecarMarker,
        current: SidecarMarker,
    },
    Discovered {
        container: WorkContainer,
    },
    AlreadyExited {
        id: String,
        name: String,
        status: ContainerStatus,
        exit_code: i64,
    },
    WaitStarted {
        id: String,
        name: String,
        status: ContainerStatus,
    },
    WaitFinished {
        id: String,
        name: String,
        status: ContainerStatus,
        exit_code: i64,
    },
    InspectFailed {
        id: String,
        name: String,
        error: String,
    },
    WaitFailed {
        id: String,
        name: String,
        error: String,
    },
}

/// Receiver for engine events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SidecarEvent);
}

/// Renders events as structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: SidecarEvent) {
        match event {
            SidecarEvent::Connected { backend } => info!(%backend, "connect {backend} ok"),
            SidecarEvent::ConnectFailed { backend, error } => {
                warn!(%backend, error = %error, "try connect {backend} failed")
            }
            SidecarEvent::Skipped { id, name, reason } => log_skip(&id, name.as_deref(), reason),
            SidecarEvent::MarkerFound { marker } => info!(
                containerid = %marker.id,
                containername = %marker.name,
                created = %marker.created.format(TIME_FORMAT),
                "skip sidecar"
            ),
            SidecarEvent::MarkerReplaced { previous, current } => warn!(
                containerid = %current.id,
                containername = %current.name,
                previous = %previous.name,
                "several sidecars match the prefix, keeping the last one listed"
            ),
            SidecarEvent::Discovered { container } => info!(
                containerid = %container.id,
                containername = %container.name,
                "found one container in pod"
            ),
            SidecarEvent::AlreadyExited {
                id,
                name,
                status,
                exit_code,
            } => info!(
                containerid = %id,
                containername = %name,
                %status,
                exitcode = exit_code,
                "container is exited"
            ),
            SidecarEvent::WaitStarted { id, name, status } => info!(
                containerid = %id,
                containername = %name,
                %status,
                "begin container wait"
            ),
            SidecarEvent::WaitFinished {
                id,
                name,
                status,
                exit_code,
            } => info!(
                containerid = %id,
                containername = %name,
                %status,
                exitcode = exit_code,
                "container wait done"
            ),
            SidecarEvent::InspectFailed { id, name, error } => warn!(
                containerid = %id,
                containername = %name,
                error = %error,
                "container inspect failed"
            ),
            SidecarEvent::WaitFailed { id, name, error } => warn!(
                containerid = %id,
                containername = %name,
                error = %error,
                "container wait failed"
            ),
        }
    }
}

fn log_skip(id: &str, name: Option<&str>, reason: SkipReason) {
    let name = name.unwrap_or_default();
    match reason {
        SkipReason::NoLabels => info!(containerid = %id, "not found labels"),
        SkipReason::ForeignPod => {
            warn!(containerid = %id, containername = %name, "pod labels do not match")
        }
        // pause containers are expected in every pod
        SkipReason::NotWorkload { kind } => debug!(
            containerid = %id,
            kind = kind.as_deref().unwrap_or_default(),
            "skip sandbox container"
        ),
        SkipReason::MissingName => warn!(containerid = %id, "container name label not found"),
        SkipReason::CreatedBeforeMarker { created, marker } => warn!(
            containerid = %id,
            containername = %name,
            "skip init container which created: {} before the sidecar create: {}",
            created.format(TIME_FORMAT),
            marker.format(TIME_FORMAT)
        ),
    }
}
