use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::error::{Result, TaskError};

/// Source of the current instant. Zone conversion is derived from it, so a
/// clock is a pure function of the wall clock.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn now_in(&self, zone: Tz) -> DateTime<Tz> {
        self.now().with_timezone(&zone)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn resolve_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| TaskError::UnknownTimezone(name.to_string()))
}

/// Resolves `name`, logging and falling back to UTC for names outside the
/// IANA database.
pub fn zone_or_utc(name: &str) -> Tz {
    match resolve_zone(name) {
        Ok(zone) => zone,
        Err(err) => {
            warn!("{}, falling back to UTC", err);
            chrono_tz::UTC
        }
    }
}
