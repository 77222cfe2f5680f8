//! Health polling until the backend answers 200.

use crate::backend::{SupervisorError, SupervisorResult};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Readiness of the backend for the current launch attempt.
///
/// Terminal once `Healthy` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum HealthState {
    Pending,
    Healthy,
    Failed(String),
}

impl HealthState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with this HTTP status
    Status(u16),
    /// Connection-level failure (refused, reset, timed out)
    Unreachable(String),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Status(200))
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Unreachable(e) => write!(f, "unreachable: {e}"),
        }
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Plain HTTP GET probe.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                // Drain the body so the connection is released.
                let _ = resp.bytes().await;
                ProbeOutcome::Status(status)
            }
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }
}

/// Polls a URL until it answers exactly 200 or the time budget runs out.
///
/// Attempts are unbounded; only wall-clock time is limited. Time comes from
/// `tokio::time`, so a paused test runtime drives the loop deterministically.
pub struct HealthWaiter {
    probe: Arc<dyn HealthProbe>,
    timeout: Duration,
    interval: Duration,
}

impl HealthWaiter {
    pub fn new(probe: Arc<dyn HealthProbe>, timeout: Duration, interval: Duration) -> Self {
        Self {
            probe,
            timeout,
            interval,
        }
    }

    /// Wait for the backend to become healthy.
    ///
    /// Returns the number of polls issued. The last sleep is clamped to the
    /// deadline, and each request may run for the remaining budget plus half
    /// an interval, so a timeout fires before `timeout + interval` even when
    /// the server accepts connections but never answers.
    pub async fn wait_healthy(&self, url: &str, cancel: &CancellationToken) -> SupervisorResult<u32> {
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            let budget = self.timeout.saturating_sub(start.elapsed()) + self.interval / 2;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SupervisorError::cancelled()),
                outcome = tokio::time::timeout(budget, self.probe.probe(url)) => {
                    outcome.unwrap_or_else(|_| {
                        ProbeOutcome::Unreachable(format!("no response within {}ms", budget.as_millis()))
                    })
                }
            };
            polls += 1;

            if outcome.is_healthy() {
                return Ok(polls);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(SupervisorError::health_timeout(
                    url,
                    elapsed.as_millis() as u64,
                    outcome.to_string(),
                ));
            }

            let pause = self.interval.min(self.timeout - elapsed);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SupervisorError::cancelled()),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
