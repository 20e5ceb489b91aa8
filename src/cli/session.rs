use crate::infra::Options;
use crate::services::{EventSink, RuntimeConnector, SidecarWatcher, select_runtime};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Picks an engine and runs discovery for the configured pod.
pub async fn discover(
    options: &Options,
    connector: &dyn RuntimeConnector,
    sink: Arc<dyn EventSink>,
) -> Result<SidecarWatcher> {
    let runtime = select_runtime(&options.selector, connector, sink.as_ref()).await?;

    let mut watcher = SidecarWatcher::new(runtime, sink).with_mode(options.wait_mode);
    watcher
        .list(&options.pod, &options.sidecar_prefix)
        .await
        .context("list containers failed")?;

    Ok(watcher)
}

/// Process exit status for an aggregate container exit code.
pub fn exit_status(code: i64) -> i32 {
    // out-of-range codes must still read as a failure
    i32::try_from(code).unwrap_or(1)
}
