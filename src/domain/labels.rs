use crate::domain::ContainerStatus;
use std::fmt;

/// Container engines the helper can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Docker,
    Containerd,
}

impl Backend {
    /// Label keys this backend's CRI integration stamps on pod containers.
    pub fn labels(&self) -> &'static LabelScheme {
        match self {
            Self::Docker => &DOCKER_LABELS,
            Self::Containerd => &CONTAINERD_LABELS,
        }
    }

    /// Status the engine reports for a container that has exited.
    pub fn exited_status(&self) -> ContainerStatus {
        match self {
            Self::Docker => ContainerStatus::Exited,
            Self::Containerd => ContainerStatus::Stopped,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => f.write_str("docker"),
            Self::Containerd => f.write_str("containerd"),
        }
    }
}

/// Label keys and the "ordinary container" sentinel of one backend.
///
/// Discovery only ever reads labels through this table, so a new backend
/// needs a new scheme, not a new classification routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelScheme {
    pub pod_namespace: &'static str,
    pub pod_name: &'static str,
    pub container_name: &'static str,
    pub kind: &'static str,
    /// Value of `kind` for workload containers; anything else is a sandbox.
    pub workload_kind: &'static str,
}

pub const POD_NAMESPACE_LABEL: &str = "io.kubernetes.pod.namespace";
pub const POD_NAME_LABEL: &str = "io.kubernetes.pod.name";
pub const CONTAINER_NAME_LABEL: &str = "io.kubernetes.container.name";

pub const DOCKER_LABELS: LabelScheme = LabelScheme {
    pod_namespace: POD_NAMESPACE_LABEL,
    pod_name: POD_NAME_LABEL,
    container_name: CONTAINER_NAME_LABEL,
    kind: "io.kubernetes.docker.type",
    workload_kind: "container",
};

pub const CONTAINERD_LABELS: LabelScheme = LabelScheme {
    pod_namespace: POD_NAMESPACE_LABEL,
    pod_name: POD_NAME_LABEL,
    container_name: CONTAINER_NAME_LABEL,
    kind: "io.cri-containerd.kind",
    workload_kind: "container",
};
