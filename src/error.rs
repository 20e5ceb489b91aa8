//! Error types for discovery and waiting.

use crate::domain::{Backend, PodIdentity};
use thiserror::Error;

/// Failures reported by a container engine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Engine unreachable or failed its liveness probe.
    #[error("{backend} not available: {reason}")]
    Connection { backend: Backend, reason: String },

    /// A request against a live engine failed.
    #[error("{backend} {operation} failed: {reason}")]
    Request {
        backend: Backend,
        operation: &'static str,
        reason: String,
    },

    /// The engine answered without the data the helper needs.
    #[error("{backend} returned no {what} for {id}")]
    MissingData {
        backend: Backend,
        what: &'static str,
        id: String,
    },

    /// The client handle was already released.
    #[error("{backend} client already closed")]
    Closed { backend: Backend },
}

impl RuntimeError {
    pub fn request(backend: Backend, operation: &'static str, err: impl ToString) -> Self {
        Self::Request {
            backend,
            operation,
            reason: err.to_string(),
        }
    }
}

/// Fatal outcomes of discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("list containers failed: {0}")]
    List(#[from] RuntimeError),

    #[error("found no sidecar container with prefix '{prefix}' in pod {pod}")]
    NoMarkerFound { pod: PodIdentity, prefix: String },

    #[error("found no container to wait on in pod {pod}")]
    NoContainersFound { pod: PodIdentity },
}

/// Waiting never fails once discovery succeeded; this only guards misuse.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("wait called before a successful discovery")]
    NotDiscovered,
}

/// Neither engine could be reached.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("can not create docker or containerd runtime (docker: {docker}; containerd: {containerd})")]
    NoRuntimeAvailable { docker: String, containerd: String },
}

/// Invalid or incomplete settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("POD_NAME and POD_NAMESPACE must be set (namespace: {namespace:?}, pod: {name:?})")]
    MissingPod { namespace: String, name: String },

    #[error("sidecar prefix must not be empty")]
    EmptySidecarPrefix,

    #[error("invalid containerd namespace '{0}'")]
    InvalidNamespace(String),

    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
