pub mod clock;
pub mod config;
pub mod credentials;
pub mod delivery;
pub mod eligibility;
pub mod error;
pub mod payload;
pub mod runner;
pub mod store;
pub mod transport;

pub use config::RunnerConfig;
pub use error::{Result, TaskError};
pub use runner::{RunSummary, Runner, TaskReport, TaskStatus};
