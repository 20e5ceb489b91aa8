use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Log layout used for creation timestamps.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Pod whose containers are being watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodIdentity {
    pub namespace: String,
    pub name: String,
}

impl PodIdentity {
    /// Returns `None` when either part is blank.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        let namespace = namespace.into();
        let name = name.into();

        if namespace.trim().is_empty() || name.trim().is_empty() {
            return None;
        }

        Some(Self { namespace, name })
    }
}

impl fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A container exactly as a backend reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    pub created: DateTime<Utc>,
    pub labels: HashMap<String, String>,
}

impl ContainerRecord {
    pub fn new(id: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created,
            labels: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// The sidecar whose creation time splits init containers from the workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarMarker {
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
}

/// A workload container the helper waits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkContainer {
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
}

/// Ordered set of workload containers, in backend listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSet {
    containers: Vec<WorkContainer>,
}

impl WorkSet {
    pub fn new(containers: Vec<WorkContainer>) -> Self {
        Self { containers }
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkContainer> {
        self.containers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a WorkSet {
    type Item = &'a WorkContainer;
    type IntoIter = std::slice::Iter<'a, WorkContainer>;

    fn into_iter(self) -> Self::IntoIter {
        self.containers.iter()
    }
}

/// Backend-neutral container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Stopped,
    Unknown,
}

impl ContainerStatus {
    /// Whether the exit code can be read without waiting.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Removing | Self::Exited | Self::Dead | Self::Stopped
        )
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Result of inspecting one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inspection {
    pub status: ContainerStatus,
    pub exit_code: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_identity_rejects_blank_parts() {
        assert!(PodIdentity::new("", "job-0").is_none());
        assert!(PodIdentity::new("default", "  ").is_none());

        let pod = PodIdentity::new("default", "job-0").unwrap();
        assert_eq!(pod.to_string(), "default/job-0");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ContainerStatus::Exited.is_terminal());
        assert!(ContainerStatus::Dead.is_terminal());
        assert!(ContainerStatus::Removing.is_terminal());
        assert!(ContainerStatus::Stopped.is_terminal());
        assert!(!ContainerStatus::Running.is_terminal());
        assert!(!ContainerStatus::Created.is_terminal());
        assert!(!ContainerStatus::Paused.is_terminal());
    }

    #[test]
    fn test_record_labels() {
        let record = ContainerRecord::new("abc", DateTime::UNIX_EPOCH).with_label("k", "v");
        assert_eq!(record.label("k"), Some("v"));
        assert_eq!(record.label("missing"), None);
    }
}
