pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{
    Backend, ContainerRecord, ContainerRuntime, ContainerStatus, Inspection, LabelScheme,
    PodIdentity, SidecarMarker, WorkContainer, WorkSet,
};
pub use error::{ConfigError, DiscoveryError, RuntimeError, SelectError, WaitError};
pub use infra::{ContainerdAdapter, DockerAdapter, EngineConnector, Options, Settings};
pub use services::{
    EventSink, ExitCodeAggregate, SidecarEvent, SidecarWatcher, TracingSink, WaitMode,
    select_runtime,
};
