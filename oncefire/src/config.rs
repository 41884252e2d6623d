use std::{path::PathBuf, time::Duration};

use clap::Parser;
use oncefire_engine::{
    clock::zone_or_utc,
    credentials::{CredentialSet, DEFAULT_KEYS_ENV},
    delivery::DeliveryPolicy,
    RunnerConfig,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Fires scheduled one-shot webhooks", long_about = None)]
pub struct Config {
    /// Directory holding one JSON file per task.
    #[arg(long, default_value = "configs")]
    pub config_dir: PathBuf,

    #[arg(long, default_value_t = 30)]
    pub tolerance_minutes: i64,

    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 2)]
    pub retry_delay_seconds: u64,

    #[arg(long, default_value_t = 20)]
    pub request_timeout_seconds: u64,

    /// Zone for tasks that do not name one.
    #[arg(long, default_value = "Asia/Shanghai")]
    pub default_timezone: String,

    /// Environment variable holding the device keys as JSON.
    #[arg(long, default_value = DEFAULT_KEYS_ENV)]
    pub keys_env: String,

    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Loads the device keys and freezes everything the runner needs.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            tolerance: chrono::Duration::minutes(self.tolerance_minutes.max(0)),
            default_timezone: zone_or_utc(&self.default_timezone),
            delivery: DeliveryPolicy {
                max_retries: self.max_retries,
                retry_delay: Duration::from_secs(self.retry_delay_seconds),
                timeout: Duration::from_secs(self.request_timeout_seconds),
            },
            credentials: CredentialSet::from_env(&self.keys_env),
        }
    }
}
