use crate::error::ConfigError;
use crate::infra::{Options, Settings};
use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pod-sidecar",
    about = "Waits for the workload containers of a pod and exits with their status"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Discover the sidecar and the workload containers, then exit
    Check,
    /// Discover, wait for every workload container and exit with their code
    Wait,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Namespace of the pod
    #[arg(long, env = "POD_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    /// Name of the pod
    #[arg(long, env = "POD_NAME", global = true)]
    pub podname: Option<String>,

    /// containerd socket (default: /var/run/containerd/containerd.sock)
    #[arg(long, global = true)]
    pub containerd: Option<PathBuf>,

    /// containerd namespace holding the CRI containers (default: k8s.io)
    #[arg(long, global = true)]
    pub containerd_namespace: Option<String>,

    /// Name prefix of the sidecar container (default: ti-cosfs-)
    #[arg(long, global = true)]
    pub sidecar: Option<String>,

    /// Skip docker and only talk to containerd
    #[arg(long, env = "CONTAINERD_ONLY", global = true, value_parser = FalseyValueParser::new())]
    pub containerd_only: bool,

    /// Wait on all workload containers at once instead of one by one
    #[arg(long, global = true)]
    pub parallel_wait: bool,

    /// TOML file with the same settings; flags and env take precedence
    #[arg(long, env = "POD_SIDECAR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Settings given on the command line or through the environment.
    pub fn settings(&self) -> Settings {
        Settings {
            namespace: self.namespace.clone(),
            podname: self.podname.clone(),
            containerd: self.containerd.clone(),
            containerd_namespace: self.containerd_namespace.clone(),
            sidecar: self.sidecar.clone(),
            containerd_only: self.containerd_only.then_some(true),
            parallel_wait: self.parallel_wait.then_some(true),
        }
    }

    /// Layers flags over the optional settings file.
    pub fn resolve(&self) -> Result<Options, ConfigError> {
        let mut settings = Settings::default();
        if let Some(path) = &self.config {
            settings.merge(Settings::load(path)?);
        }
        settings.merge(self.settings());
        settings.into_options()
    }
}
