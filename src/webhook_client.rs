use crate::config::Config;
use crate::errors::AppError;
use crate::models::WebhookPayload;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Delay before each retry, in milliseconds. The last entry repeats once the
/// schedule runs out.
pub const BACKOFF_SCHEDULE_MS: [u64; 6] = [2000, 3000, 5000, 8000, 10000, 15000];

/// Body reported when every attempt got a response but none was 2xx and the
/// last one carried no body.
pub const MAX_RETRIES_EXCEEDED: &str = "Max retries exceeded";

/// Attempt cap and backoff schedule for one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
    max_attempts: u32,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            delays: BACKOFF_SCHEDULE_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetrySchedule {
    /// An empty delay list falls back to the default schedule; `max_attempts`
    /// is at least 1.
    pub fn new(delays: Vec<Duration>, max_attempts: u32) -> Self {
        let delays = if delays.is_empty() {
            Self::default().delays
        } else {
            delays
        };
        Self {
            delays,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(self.delays, max_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the attempt at zero-based `attempt_index` failed.
    pub fn delay_after(&self, attempt_index: u32) -> Duration {
        let last = self.delays.len() - 1;
        self.delays[(attempt_index as usize).min(last)]
    }
}

/// Result of a whole retry sequence against one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub success: bool,
    /// Status of the last HTTP response, absent if the last attempt never got one.
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub attempts: u32,
}

impl DeliveryOutcome {
    /// True when the final response was a 4xx, i.e. the input was likely wrong.
    pub fn ended_with_client_error(&self) -> bool {
        matches!(self.status_code, Some(code) if (400..500).contains(&code))
    }
}

/// Delivers one payload to one URL and reports how it went.
///
/// Never fails: every fault is folded into the returned outcome.
#[async_trait]
pub trait WebhookDelivery: Send + Sync {
    async fn deliver(&self, url: &str, payload: &WebhookPayload) -> DeliveryOutcome;
}

/// HTTP client for the external automation webhook.
///
/// Keeps retrying on any non-2xx status and on network failures, on the
/// assumption that the automation endpoint may still be waking up.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    schedule: RetrySchedule,
}

impl WebhookClient {
    /// Creates a new `WebhookClient`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-attempt HTTP timeout.
    /// * `schedule` - Attempt cap and backoff delays.
    pub fn new(timeout: Duration, schedule: RetrySchedule) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create webhook client: {}", e))
            })?;

        Ok(Self { client, schedule })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            Duration::from_secs(config.webhook_timeout_secs),
            RetrySchedule::default().with_max_attempts(config.webhook_max_attempts),
        )
    }

    pub fn schedule(&self) -> &RetrySchedule {
        &self.schedule
    }
}

#[async_trait]
impl WebhookDelivery for WebhookClient {
    async fn deliver(&self, url: &str, payload: &WebhookPayload) -> DeliveryOutcome {
        let max_attempts = self.schedule.max_attempts();
        let mut last_status: Option<u16> = None;
        let mut last_body: Option<String> = None;

        for attempt in 0..max_attempts {
            let attempt_no = attempt + 1;
            tracing::info!("Webhook attempt {} of {} to {}", attempt_no, max_attempts, url);
            let started = Instant::now();

            match self.client.post(url).json(payload).send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_else(|e| {
                        tracing::warn!("Failed to read webhook response body: {}", e);
                        String::new()
                    });

                    tracing::info!(
                        attempt = attempt_no,
                        status = status.as_u16(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Webhook response received"
                    );
                    tracing::debug!("Webhook response body: {}", body);

                    if status.is_success() {
                        return DeliveryOutcome {
                            success: true,
                            status_code: Some(status.as_u16()),
                            response_body: Some(body),
                            attempts: attempt_no,
                        };
                    }

                    // 4xx included: the endpoint may be mid-deployment
                    last_status = Some(status.as_u16());
                    last_body = Some(body);
                }
                Err(e) => {
                    tracing::error!(
                        attempt = attempt_no,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Webhook attempt {} failed: {}",
                        attempt_no,
                        e
                    );

                    if attempt_no >= max_attempts {
                        return DeliveryOutcome {
                            success: false,
                            status_code: None,
                            response_body: Some(e.to_string()),
                            attempts: attempt_no,
                        };
                    }
                    last_status = None;
                    last_body = None;
                }
            }

            if attempt_no < max_attempts {
                let delay = self.schedule.delay_after(attempt);
                tracing::debug!("Waiting {:?} before webhook attempt {}", delay, attempt_no + 1);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::warn!("Webhook delivery exhausted after {} attempts", max_attempts);
        DeliveryOutcome {
            success: false,
            status_code: last_status,
            response_body: Some(
                last_body
                    .filter(|b| !b.trim().is_empty())
                    .unwrap_or_else(|| MAX_RETRIES_EXCEEDED.to_string()),
            ),
            attempts: max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.max_attempts(), 60);
        assert_eq!(schedule.delay_after(0), Duration::from_millis(2000));
        assert_eq!(schedule.delay_after(1), Duration::from_millis(3000));
        assert_eq!(schedule.delay_after(4), Duration::from_millis(10000));
        assert_eq!(schedule.delay_after(5), Duration::from_millis(15000));
    }

    #[test]
    fn test_schedule_repeats_last_delay() {
        let schedule = RetrySchedule::default();
        for attempt in 5..60 {
            assert_eq!(schedule.delay_after(attempt), Duration::from_millis(15000));
        }
    }

    #[test]
    fn test_schedule_guards() {
        let schedule = RetrySchedule::new(vec![], 0);
        assert_eq!(schedule.max_attempts(), 1);
        assert_eq!(schedule.delay_after(0), Duration::from_millis(2000));
    }

    #[test]
    fn test_client_error_detection() {
        let outcome = DeliveryOutcome {
            success: false,
            status_code: Some(422),
            response_body: None,
            attempts: 60,
        };
        assert!(outcome.ended_with_client_error());

        let outcome = DeliveryOutcome {
            status_code: Some(503),
            ..outcome
        };
        assert!(!outcome.ended_with_client_error());

        let outcome = DeliveryOutcome {
            status_code: None,
            ..outcome
        };
        assert!(!outcome.ended_with_client_error());
    }

    #[test]
    fn test_client_creation() {
        let client = WebhookClient::new(Duration::from_secs(5), RetrySchedule::default());
        assert!(client.is_ok());
    }
}
