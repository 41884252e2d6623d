use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use oncefire_models::core::{TaskRecord, TIME_FORMAT};

use crate::error::{Result, TaskError};

pub const DEFAULT_TOLERANCE_MINUTES: i64 = 30;

/// Where a task stands relative to its eligibility window
/// `[trigger_time, trigger_time + tolerance]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    AlreadyDone,
    /// No trigger time; the record is left alone.
    Inert,
    NotYetDue { delay: Duration },
    Eligible { delay: Duration },
    /// Missed for good. Never retried and never marked executed.
    Expired { delay: Duration },
}

impl Eligibility {
    /// Minutes elapsed since the trigger time, negative while still pending.
    pub fn delay_minutes(&self) -> Option<f64> {
        match self {
            Eligibility::NotYetDue { delay }
            | Eligibility::Eligible { delay }
            | Eligibility::Expired { delay } => Some(delay.num_milliseconds() as f64 / 60_000.0),
            Eligibility::AlreadyDone | Eligibility::Inert => None,
        }
    }
}

pub fn evaluate_record(
    record: &TaskRecord,
    zone: Tz,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<Eligibility> {
    if record.is_executed() {
        return Ok(Eligibility::AlreadyDone);
    }
    let trigger_time = record.trigger_time().map_err(|err| TaskError::TriggerTime {
        value: err.found.to_string(),
        reason: format!("expected {}", err.expected),
    })?;
    evaluate(trigger_time, zone, false, now, tolerance)
}

/// Classifies one task. `executed` short-circuits before the trigger time is
/// even looked at.
pub fn evaluate(
    trigger_time: Option<&str>,
    zone: Tz,
    executed: bool,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<Eligibility> {
    if executed {
        return Ok(Eligibility::AlreadyDone);
    }
    let raw = match trigger_time {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(Eligibility::Inert),
    };

    let trigger = parse_trigger_time(raw, zone)?;
    let delay = now.signed_duration_since(trigger.with_timezone(&Utc));

    if delay < Duration::zero() {
        Ok(Eligibility::NotYetDue { delay })
    } else if delay <= tolerance {
        Ok(Eligibility::Eligible { delay })
    } else {
        Ok(Eligibility::Expired { delay })
    }
}

/// Interprets a naive `trigger_time` in `zone`. A time inside a DST fold
/// takes the earlier instant; a time inside a DST gap moves forward an hour.
pub fn parse_trigger_time(raw: &str, zone: Tz) -> Result<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(raw, TIME_FORMAT).map_err(|err| {
        TaskError::TriggerTime {
            value: raw.to_string(),
            reason: err.to_string(),
        }
    })?;

    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .ok_or_else(|| TaskError::TriggerTime {
            value: raw.to_string(),
            reason: format!("local time does not exist in {}", zone.name()),
        })
}
