use crate::domain::PodIdentity;
use crate::error::ConfigError;
use crate::services::{SelectorOptions, WaitMode};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONTAINERD_ADDRESS: &str = "/var/run/containerd/containerd.sock";
pub const DEFAULT_CONTAINERD_NAMESPACE: &str = "k8s.io";
pub const DEFAULT_SIDECAR_PREFIX: &str = "ti-cosfs-";

/// Partial settings from one source (file, environment or flags).
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub namespace: Option<String>,
    pub podname: Option<String>,
    pub containerd: Option<PathBuf>,
    pub containerd_namespace: Option<String>,
    pub sidecar: Option<String>,
    pub containerd_only: Option<bool>,
    pub parallel_wait: Option<bool>,
}

impl Settings {
    /// Reads a TOML settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        debug!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }

    /// Merges another Settings into self.
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: Settings) {
        if let Some(ns) = other.namespace {
            self.namespace = Some(ns);
        }
        if let Some(name) = other.podname {
            self.podname = Some(name);
        }
        if let Some(addr) = other.containerd {
            self.containerd = Some(addr);
        }
        if let Some(ns) = other.containerd_namespace {
            self.containerd_namespace = Some(ns);
        }
        if let Some(prefix) = other.sidecar {
            self.sidecar = Some(prefix);
        }
        if let Some(only) = other.containerd_only {
            self.containerd_only = Some(only);
        }
        if let Some(parallel) = other.parallel_wait {
            self.parallel_wait = Some(parallel);
        }
    }

    /// Fills defaults and validates.
    pub fn into_options(self) -> Result<Options, ConfigError> {
        let namespace = self.namespace.unwrap_or_default();
        let name = self.podname.unwrap_or_default();
        let pod = PodIdentity::new(namespace.clone(), name.clone())
            .ok_or(ConfigError::MissingPod { namespace, name })?;

        let sidecar_prefix = self
            .sidecar
            .unwrap_or_else(|| DEFAULT_SIDECAR_PREFIX.to_string());
        if sidecar_prefix.is_empty() {
            return Err(ConfigError::EmptySidecarPrefix);
        }

        let containerd_namespace = self
            .containerd_namespace
            .unwrap_or_else(|| DEFAULT_CONTAINERD_NAMESPACE.to_string());
        if containerd_namespace.trim().is_empty() || !containerd_namespace.is_ascii() {
            return Err(ConfigError::InvalidNamespace(containerd_namespace));
        }

        let containerd_address = self
            .containerd
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTAINERD_ADDRESS));

        let wait_mode = if self.parallel_wait.unwrap_or(false) {
            WaitMode::Parallel
        } else {
            WaitMode::Sequential
        };

        Ok(Options {
            pod,
            selector: SelectorOptions {
                containerd_only: self.containerd_only.unwrap_or(false),
                containerd_address,
                containerd_namespace,
            },
            sidecar_prefix,
            wait_mode,
        })
    }
}

/// Immutable settings threaded through selection, discovery and waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub pod: PodIdentity,
    pub selector: SelectorOptions,
    pub sidecar_prefix: String,
    pub wait_mode: WaitMode,
}

fn expand_home(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.to_string_lossy().as_ref()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_settings() -> Settings {
        Settings {
            namespace: Some("default".into()),
            podname: Some("train-0".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let options = pod_settings().into_options().unwrap();

        assert_eq!(options.pod, PodIdentity::new("default", "train-0").unwrap());
        assert_eq!(options.sidecar_prefix, DEFAULT_SIDECAR_PREFIX);
        assert_eq!(options.wait_mode, WaitMode::Sequential);
        assert!(!options.selector.containerd_only);
        assert_eq!(
            options.selector.containerd_address,
            PathBuf::from(DEFAULT_CONTAINERD_ADDRESS)
        );
        assert_eq!(options.selector.containerd_namespace, "k8s.io");
    }

    #[test]
    fn test_missing_pod_is_rejected() {
        let result = Settings {
            namespace: Some("default".into()),
            ..Default::default()
        }
        .into_options();

        assert!(matches!(result, Err(ConfigError::MissingPod { .. })));
        assert!(matches!(
            Settings::default().into_options(),
            Err(ConfigError::MissingPod { .. })
        ));
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let settings = Settings {
            sidecar: Some(String::new()),
            ..pod_settings()
        };
        assert!(matches!(
            settings.into_options(),
            Err(ConfigError::EmptySidecarPrefix)
        ));
    }

    #[test]
    fn test_merge_overrides_only_present_values() {
        let mut base = Settings {
            sidecar: Some("fuse-".into()),
            containerd_only: Some(true),
            ..pod_settings()
        };
        base.merge(Settings {
            podname: Some("train-1".into()),
            containerd_only: Some(false),
            ..Default::default()
        });

        assert_eq!(base.namespace.as_deref(), Some("default"));
        assert_eq!(base.podname.as_deref(), Some("train-1"));
        assert_eq!(base.sidecar.as_deref(), Some("fuse-"));
        assert_eq!(base.containerd_only, Some(false));
    }

    #[test]
    fn test_parallel_wait_flag() {
        let settings = Settings {
            parallel_wait: Some(true),
            ..pod_settings()
        };
        assert_eq!(settings.into_options().unwrap().wait_mode, WaitMode::Parallel);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidecar.toml");
        fs::write(
            &path,
            r#"
namespace = "jobs"
podname = "train-0"
sidecar = "fuse-"
containerd = "/run/k3s/containerd/containerd.sock"
containerd_only = true
"#,
        )
        .unwrap();

        let options = Settings::load(&path).unwrap().into_options().unwrap();
        assert_eq!(options.pod.namespace, "jobs");
        assert_eq!(options.sidecar_prefix, "fuse-");
        assert!(options.selector.containerd_only);
        assert_eq!(
            options.selector.containerd_address,
            PathBuf::from("/run/k3s/containerd/containerd.sock")
        );
    }

    #[test]
    fn test_unknown_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidecar.toml");
        fs::write(&path, "pod_name = \"oops\"\n").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Settings::load(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
