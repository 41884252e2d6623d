use std::path::Path;

use log::info;
use oncefire_models::errors::SendableError;

use crate::logger::{self, print_env};

/// Installs logging and the panic hook, then prints the run banner.
pub fn startup(name: &str, log_file: Option<&Path>) -> Result<(), SendableError> {
    logger::setup_logger(log_file)?;
    log_panics::init();

    info!("--- {} ---", name);
    print_env()?;

    Ok(())
}
