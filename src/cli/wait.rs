use crate::cli::session::{discover, exit_status};
use crate::infra::Options;
use crate::services::{EventSink, RuntimeConnector};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Discovers the workload and blocks until all of it exited.
///
/// Returns the process exit status mirroring the aggregate exit code.
pub async fn run(
    options: &Options,
    connector: &dyn RuntimeConnector,
    sink: Arc<dyn EventSink>,
) -> Result<i32> {
    let mut watcher = discover(options, connector, sink).await?;

    let code = watcher.wait().await?;
    watcher.close();

    info!(exitcode = code, "all containers exited");
    Ok(exit_status(code))
}
