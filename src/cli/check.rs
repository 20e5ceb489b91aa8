use crate::cli::session::discover;
use crate::infra::Options;
use crate::services::{EventSink, RuntimeConnector};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Runs discovery only; succeeds when a sidecar and a workload were found.
pub async fn run(
    options: &Options,
    connector: &dyn RuntimeConnector,
    sink: Arc<dyn EventSink>,
) -> Result<i32> {
    let mut watcher = discover(options, connector, sink).await?;

    if let (Some(marker), Some(work_set)) = (watcher.marker(), watcher.work_set()) {
        info!(
            backend = %watcher.backend(),
            sidecar = %marker.name,
            containers = ?work_set.names(),
            "pod check passed"
        );
    }

    watcher.close();
    Ok(0)
}
