//! Engine configuration with documented defaults.
//!
//! Everything is supplied once at startup; there is no hot reload. A
//! rescan or restart picks up platform changes.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ThresholdTable;
use crate::probe::RetryConfig;

/// Top-level configuration for the polling engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between poll cycles. Storage telemetry is slow-changing,
    /// so the default is 60 seconds.
    pub poll_interval: Duration,
    /// Upper bound on simultaneous device probes per cycle, to avoid
    /// saturating a shared bus. Default: 4.
    pub max_concurrent_probes: usize,
    /// Retry and backoff policy for transient probe failures.
    pub retry: RetryConfig,
    /// Consecutive ERROR classifications required before the held state
    /// enters ERROR. Default: 3. Values below 1 are treated as 1.
    pub error_debounce_cycles: u32,
    /// Threshold-table overrides keyed by device class
    /// ("ata", "nvme", "emmc", or a vendor name).
    pub thresholds: BTreeMap<String, ThresholdTable>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_concurrent_probes: 4,
            retry: RetryConfig::default(),
            error_debounce_cycles: 3,
            thresholds: BTreeMap::new(),
        }
    }
}
