mod container;
mod labels;
pub mod traits;

pub use container::{
    ContainerRecord, ContainerStatus, Inspection, PodIdentity, SidecarMarker, TIME_FORMAT,
    WorkContainer, WorkSet,
};
pub use labels::{
    Backend, CONTAINER_NAME_LABEL, CONTAINERD_LABELS, DOCKER_LABELS, LabelScheme,
    POD_NAME_LABEL, POD_NAMESPACE_LABEL,
};
pub use traits::ContainerRuntime;
