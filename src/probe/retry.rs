//! Bounded retry with backoff around probe calls.
//!
//! [`RetryPolicy::fetch`] converts flaky probe access into a definitive
//! per-cycle outcome: either a snapshot or [`FetchOutcome::Unavailable`]
//! after the attempt budget is spent. Probe errors never surface past this
//! module.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::device::{DeviceIdentity, RawSnapshot};
use crate::error::ProbeError;

/// Time source and sleep abstraction.
///
/// Production code uses [`TokioClock`]; tests inject a mock so retry and
/// scheduling behavior can be verified without real waiting.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock [`Clock`] backed by `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Configuration for [`RetryPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum probe attempts per poll cycle, including the first.
    /// Values below 1 are treated as 1. Default: 3.
    pub max_attempts: u32,
    /// Delays between attempts. The last entry repeats when attempts
    /// outnumber entries; an empty sequence means no waiting.
    /// Default: 1s, 2s, 5s.
    pub backoff: Vec<Duration>,
    /// Budget for a single probe call; an attempt exceeding it counts as
    /// a timed-out attempt. Default: 10s.
    pub timeout_per_attempt: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
            ],
            timeout_per_attempt: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given 1-based attempt, or `None` when the
    /// backoff sequence is empty.
    fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if self.backoff.is_empty() {
            return None;
        }
        let index = (attempt as usize - 1).min(self.backoff.len() - 1);
        Some(self.backoff[index])
    }
}

/// Definitive outcome of one poll cycle's fetch for a device.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A probe attempt succeeded.
    Snapshot(RawSnapshot),
    /// Every attempt failed; carries the last error for diagnostics.
    Unavailable { last_error: ProbeError },
}

impl FetchOutcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FetchOutcome::Unavailable { .. })
    }
}

/// Wraps [`crate::probe::DeviceProbe`] calls with bounded retries.
pub struct RetryPolicy {
    config: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Inject a clock for deterministic tests.
    pub fn with_clock(config: RetryConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Attempt the probe up to `max_attempts` times.
    ///
    /// Success on any attempt returns immediately. Between attempts the
    /// policy sleeps the configured backoff. Never returns an error: after
    /// exhausting the budget the last [`ProbeError`] is carried inside
    /// [`FetchOutcome::Unavailable`].
    pub async fn fetch(
        &self,
        probe: &dyn super::DeviceProbe,
        id: &DeviceIdentity,
    ) -> FetchOutcome {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<ProbeError> = None;

        for attempt in 1..=attempts {
            let result =
                tokio::time::timeout(self.config.timeout_per_attempt, probe.probe(id)).await;

            match result {
                Ok(Ok(snapshot)) => {
                    if attempt > 1 {
                        debug!(device = %id, attempt, "probe recovered after retry");
                    }
                    return FetchOutcome::Snapshot(snapshot);
                }
                Ok(Err(error)) => {
                    warn!(device = %id, attempt, max = attempts, %error, "probe attempt failed");
                    last_error = Some(error);
                }
                Err(_) => {
                    let error = ProbeError::Timeout(self.config.timeout_per_attempt);
                    warn!(device = %id, attempt, max = attempts, %error, "probe attempt failed");
                    last_error = Some(error);
                }
            }

            if attempt < attempts {
                if let Some(delay) = self.config.delay_after(attempt) {
                    self.clock.sleep(delay).await;
                }
            }
        }

        // attempts >= 1, so at least one error was recorded.
        let last_error =
            last_error.unwrap_or_else(|| ProbeError::Timeout(self.config.timeout_per_attempt));
        FetchOutcome::Unavailable { last_error }
    }
}
