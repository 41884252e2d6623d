use chrono::Utc;
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use oncefire_models::core::{TaskId, TaskRecord};

use crate::{
    clock::{zone_or_utc, Clock},
    config::RunnerConfig,
    delivery::{deliver, Pause},
    eligibility::{evaluate_record, Eligibility},
    payload::build_request,
    store::TaskStore,
    transport::Transport,
};

/// How one record ended up after a run.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    /// The record could not be read or parsed.
    ReadFailed(String),
    /// The record was readable but unusable this run (bad trigger time,
    /// payload or method).
    Invalid(String),
    AlreadyDone,
    Inert,
    NotYetDue,
    Expired,
    Failed { attempts: usize },
    /// The callback went out. `persisted` is false when saving the record
    /// failed afterwards, in which case the next run may send it again.
    Delivered { attempts: usize, persisted: bool },
}

impl TaskStatus {
    pub fn changed_state(&self) -> bool {
        matches!(
            self,
            TaskStatus::Delivered {
                persisted: true,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub id: TaskId,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<TaskReport>,
    pub changed: bool,
}

/// One pass over every task record, strictly sequential.
pub struct Runner<S, T, C, P> {
    store: S,
    transport: T,
    clock: C,
    pause: P,
    config: RunnerConfig,
}

impl<S, T, C, P> Runner<S, T, C, P>
where
    S: TaskStore,
    T: Transport,
    C: Clock,
    P: Pause,
{
    pub fn new(store: S, transport: T, clock: C, pause: P, config: RunnerConfig) -> Self {
        Self {
            store,
            transport,
            clock,
            pause,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pause(&self) -> &P {
        &self.pause
    }

    pub fn run(&self) -> RunSummary {
        let mut ids = match self.store.discover() {
            Ok(ids) => ids,
            Err(err) => {
                error!("{}", err);
                return RunSummary::default();
            }
        };
        if ids.is_empty() {
            info!("No task records found");
        }
        ids.sort();

        let reports: Vec<TaskReport> = ids
            .into_iter()
            .map(|id| {
                let status = self.process_one_task(&id);
                TaskReport { id, status }
            })
            .collect();
        let changed = reports.iter().any(|report| report.status.changed_state());

        if changed {
            info!("Run complete: task state changed");
        } else {
            info!("Run complete: no state changes");
        }
        RunSummary { reports, changed }
    }

    fn process_one_task(&self, id: &TaskId) -> TaskStatus {
        info!("Checking task {}", id);

        let mut record = match self.store.read(id) {
            Ok(record) => record,
            Err(err) => {
                error!("{}", err);
                return TaskStatus::ReadFailed(err.to_string());
            }
        };

        if record.is_executed() {
            info!("Skipping, task already executed");
            return TaskStatus::AlreadyDone;
        }

        let zone = self.zone_for(&record);
        let now = self.clock.now_in(zone);
        let eligibility =
            match evaluate_record(&record, zone, now.with_timezone(&Utc), self.config.tolerance) {
                Ok(eligibility) => eligibility,
                Err(err) => {
                    error!("{}: {}", id, err);
                    return TaskStatus::Invalid(err.to_string());
                }
            };

        if let Some(minutes) = eligibility.delay_minutes() {
            info!(
                "Trigger {} | now {} ({}) | delay {:.1} min",
                record.trigger_time().ok().flatten().unwrap_or_default(),
                now.format("%H:%M:%S"),
                zone.name(),
                minutes
            );
        }

        match eligibility {
            Eligibility::AlreadyDone => {
                info!("Skipping, task already executed");
                return TaskStatus::AlreadyDone;
            }
            Eligibility::Inert => {
                debug!("No trigger_time, nothing to do");
                return TaskStatus::Inert;
            }
            Eligibility::NotYetDue { .. } => {
                info!("Not due yet");
                return TaskStatus::NotYetDue;
            }
            Eligibility::Expired { .. } => {
                info!(
                    "Expired, more than {} minutes late; will not run",
                    self.config.tolerance.num_minutes()
                );
                return TaskStatus::Expired;
            }
            Eligibility::Eligible { .. } => {}
        }

        let request = match build_request(&record, &self.config.credentials) {
            Ok(request) => request,
            Err(err) => {
                error!("{}: {}", id, err);
                return TaskStatus::Invalid(err.to_string());
            }
        };

        let report = deliver(&self.transport, &self.pause, &request, &self.config.delivery);
        let attempts = report.attempts.len();
        if !report.is_delivered() {
            error!("Giving up on {} after {} attempt(s)", id, attempts);
            return TaskStatus::Failed { attempts };
        }

        record.mark_executed(&now);
        match self.store.save(id, &record) {
            Ok(()) => {
                info!("State updated and saved");
                TaskStatus::Delivered {
                    attempts,
                    persisted: true,
                }
            }
            Err(err) => {
                warn!(
                    "Callback delivered but state was not saved, it may be sent again next run: {}",
                    err
                );
                TaskStatus::Delivered {
                    attempts,
                    persisted: false,
                }
            }
        }
    }

    fn zone_for(&self, record: &TaskRecord) -> Tz {
        match record.timezone() {
            Ok(None) => self.config.default_timezone,
            Ok(Some(name)) => zone_or_utc(name),
            Err(err) => {
                warn!("{}, falling back to UTC", err);
                chrono_tz::UTC
            }
        }
    }
}
