pub mod config;
pub mod connector;
pub mod containerd_adapter;
pub mod docker_adapter;

pub use config::{Options, Settings};
pub use connector::EngineConnector;
pub use containerd_adapter::ContainerdAdapter;
pub use docker_adapter::DockerAdapter;
