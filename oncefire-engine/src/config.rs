use chrono::Duration;
use chrono_tz::Tz;

use crate::{
    credentials::CredentialSet,
    delivery::DeliveryPolicy,
    eligibility::DEFAULT_TOLERANCE_MINUTES,
};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Shanghai;

/// Everything a run depends on besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How late a task may still fire.
    pub tolerance: Duration,
    /// Zone for records without a `timezone` field.
    pub default_timezone: Tz,
    pub delivery: DeliveryPolicy,
    pub credentials: CredentialSet,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tolerance: Duration::minutes(DEFAULT_TOLERANCE_MINUTES),
            default_timezone: DEFAULT_TIMEZONE,
            delivery: DeliveryPolicy::default(),
            credentials: CredentialSet::default(),
        }
    }
}
