pub mod args;
pub mod check;
pub mod session;
pub mod wait;

pub use args::{Cli, Commands, GlobalArgs, LogFormat};

use crate::infra::Options;
use crate::services::{EventSink, RuntimeConnector};
use anyhow::Result;
use std::sync::Arc;

/// Runs a command and returns the process exit status.
pub async fn run(
    command: Commands,
    options: &Options,
    connector: &dyn RuntimeConnector,
    sink: Arc<dyn EventSink>,
) -> Result<i32> {
    match command {
        Commands::Check => check::run(options, connector, sink).await,
        Commands::Wait => wait::run(options, connector, sink).await,
    }
}
