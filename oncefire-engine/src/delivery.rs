use std::time::Duration;

use log::{info, warn};

use crate::{payload::WebhookRequest, transport::Transport};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Attempt budget for one task. Every task starts from a fresh budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// The wait between attempts.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Success,
    ServerRejected,
    TransportError,
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: AttemptStatus,
    pub status_code: Option<u16>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub result: Delivery,
    pub attempts: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.result == Delivery::Delivered
    }
}

/// Sends `request` until a 2xx arrives or the budget runs out. Rejections and
/// transport faults are retried alike; nothing here returns an error.
pub fn deliver(
    transport: &impl Transport,
    pause: &impl Pause,
    request: &WebhookRequest,
    policy: &DeliveryPolicy,
) -> DeliveryReport {
    let max_attempts = policy.max_retries.max(1);
    let mut attempts = Vec::new();

    for attempt in 1..=max_attempts {
        info!(
            "Sending {} {} (attempt {}/{})",
            request.method, request.url, attempt, max_attempts
        );
        let outcome = match transport.send(request, policy.timeout) {
            Ok(response) if (200..300).contains(&response.status) => {
                info!("Delivered, server returned {}", response.status);
                DeliveryOutcome {
                    status: AttemptStatus::Success,
                    status_code: Some(response.status),
                    body: Some(response.body),
                }
            }
            Ok(response) => {
                warn!("Server rejected the callback with {}", response.status);
                DeliveryOutcome {
                    status: AttemptStatus::ServerRejected,
                    status_code: Some(response.status),
                    body: Some(response.body),
                }
            }
            Err(err) => {
                warn!("{}", err);
                DeliveryOutcome {
                    status: AttemptStatus::TransportError,
                    status_code: None,
                    body: None,
                }
            }
        };

        let delivered = outcome.status == AttemptStatus::Success;
        attempts.push(outcome);
        if delivered {
            return DeliveryReport {
                result: Delivery::Delivered,
                attempts,
            };
        }
        if attempt < max_attempts {
            info!("Retrying in {:?}", policy.retry_delay);
            pause.pause(policy.retry_delay);
        }
    }

    DeliveryReport {
        result: Delivery::Failed,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque};

    use reqwest::{Method, Url};
    use serde_json::Map;

    use super::*;
    use crate::transport::{TransportError, TransportResponse};

    /// Replays scripted statuses; `None` stands for a transport fault.
    struct ScriptedTransport {
        script: RefCell<VecDeque<Option<u16>>>,
        sent: RefCell<usize>,
    }

    impl ScriptedTransport {
        fn new(script: &[Option<u16>]) -> Self {
            Self {
                script: RefCell::new(script.iter().copied().collect()),
                sent: RefCell::new(0),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn send(
            &self,
            _request: &WebhookRequest,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            *self.sent.borrow_mut() += 1;
            match self.script.borrow_mut().pop_front().expect("script exhausted") {
                Some(status) => Ok(TransportResponse {
                    status,
                    body: format!("status {status}"),
                }),
                None => Err(TransportError::InvalidUrl {
                    url: "::".into(),
                    source: Url::parse("::").unwrap_err(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPause(RefCell<Vec<Duration>>);

    impl Pause for RecordingPause {
        fn pause(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    fn request() -> WebhookRequest {
        WebhookRequest {
            method: Method::POST,
            url: "https://push.example/send".into(),
            payload: Map::new(),
        }
    }

    fn run(script: &[Option<u16>], policy: DeliveryPolicy) -> (DeliveryReport, usize, Vec<Duration>) {
        let transport = ScriptedTransport::new(script);
        let pause = RecordingPause::default();
        let report = deliver(&transport, &pause, &request(), &policy);
        let sent = *transport.sent.borrow();
        (report, sent, pause.0.into_inner())
    }

    #[test]
    fn first_success_stops_immediately() {
        let (report, sent, pauses) = run(&[Some(200)], DeliveryPolicy::default());
        assert!(report.is_delivered());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].status_code, Some(200));
        assert_eq!(sent, 1);
        assert!(pauses.is_empty());
    }

    #[test]
    fn three_rejections_fail_after_two_pauses() {
        let (report, sent, pauses) =
            run(&[Some(500), Some(500), Some(500)], DeliveryPolicy::default());
        assert_eq!(report.result, Delivery::Failed);
        assert_eq!(sent, 3);
        assert!(report
            .attempts
            .iter()
            .all(|attempt| attempt.status == AttemptStatus::ServerRejected));
        assert_eq!(pauses, vec![DEFAULT_RETRY_DELAY; 2]);
    }

    #[test]
    fn success_on_last_attempt_is_delivered() {
        let (report, sent, pauses) =
            run(&[Some(500), Some(500), Some(200)], DeliveryPolicy::default());
        assert!(report.is_delivered());
        assert_eq!(report.attempts.len(), 3);
        assert_eq!(sent, 3);
        assert_eq!(pauses.len(), 2);
    }

    #[test]
    fn transport_faults_retry_like_rejections() {
        let (report, _, pauses) = run(&[None, Some(204)], DeliveryPolicy::default());
        assert!(report.is_delivered());
        assert_eq!(report.attempts[0].status, AttemptStatus::TransportError);
        assert_eq!(report.attempts[0].status_code, None);
        assert_eq!(pauses.len(), 1);
    }

    #[test]
    fn redirects_and_client_errors_are_not_success() {
        let (report, _, _) = run(&[Some(302), Some(404), Some(300)], DeliveryPolicy::default());
        assert_eq!(report.result, Delivery::Failed);
    }

    #[test]
    fn zero_budget_still_makes_one_attempt() {
        let policy = DeliveryPolicy {
            max_retries: 0,
            ..DeliveryPolicy::default()
        };
        let (report, sent, pauses) = run(&[Some(503)], policy);
        assert_eq!(report.result, Delivery::Failed);
        assert_eq!(sent, 1);
        assert!(pauses.is_empty());
    }
}
