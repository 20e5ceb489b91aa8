mod logging;

use clap::Parser;
use pod_sidecar::cli::{self, Cli};
use pod_sidecar::{EngineConnector, TracingSink};
use std::process;
use std::sync::Arc;
use tracing::{Instrument, error, info_span};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.log_format);

    let options = match cli.global.resolve() {
        Ok(options) => options,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            process::exit(1);
        }
    };

    let span = info_span!(
        "sidecar",
        podnamespace = %options.pod.namespace,
        podname = %options.pod.name
    );

    let result = cli::run(cli.command, &options, &EngineConnector, Arc::new(TracingSink))
        .instrument(span)
        .await;

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!(error = %format!("{err:#}"), "sidecar failed");
            process::exit(1);
        }
    }
}
