mod config;

use clap::Parser;
use log::{info, warn};
use oncefire_engine::{
    clock::SystemClock, delivery::ThreadPause, store::DirectoryStore, transport::HttpTransport,
    Runner, TaskStatus,
};
use oncefire_models::errors::{RuntimeError, SendableError};
use oncefire_utilities::startup;

use crate::config::Config;

fn main() -> Result<(), SendableError> {
    let config = Config::parse();
    startup::startup("oncefire", config.log_file.as_deref())?;

    let runner_config = config.runner_config();
    let transport = HttpTransport::new()
        .map_err(|err| RuntimeError::boxed("startup.http_client", err))?;

    let store = DirectoryStore::new(&config.config_dir);
    info!("Scanning {}", store.dir().display());
    let runner = Runner::new(
        store,
        transport,
        SystemClock,
        ThreadPause,
        runner_config,
    );
    let summary = runner.run();

    // Per-task failures are reported, never turned into an exit status.
    let needs_attention = summary
        .reports
        .iter()
        .filter(|report| {
            matches!(
                report.status,
                TaskStatus::Failed { .. }
                    | TaskStatus::ReadFailed(_)
                    | TaskStatus::Invalid(_)
                    | TaskStatus::Delivered {
                        persisted: false,
                        ..
                    }
            )
        })
        .count();
    if needs_attention > 0 {
        warn!("{} task record(s) need attention", needs_attention);
    }
    info!(
        "{} task record(s) checked, state {}",
        summary.reports.len(),
        if summary.changed { "changed" } else { "unchanged" }
    );
    Ok(())
}
