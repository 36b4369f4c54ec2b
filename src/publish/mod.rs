//! Delta publishing to the shared state store.
//!
//! [`StatePublisher`] turns the in-memory device states into
//! [`HealthRecord`]s and writes them through the [`StateStore`] capability.
//! It remembers what was last published per device and writes only records
//! whose content actually changed, so downstream consumers (show-commands,
//! alerting, failover logic) see no churn from steady-state cycles.
//!
//! A failed write leaves the published set untouched; the same delta is
//! simply retried on the next cycle. The in-memory [`DeviceState`] remains
//! authoritative regardless, so health information is never lost, only
//! delayed.

use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::classify::HealthStatus;
use crate::device::constants::{ATTR_FIRMWARE, ATTR_MODEL, ATTR_SERIAL};
use crate::device::DeviceIdentity;
use crate::error::PublishError;
use crate::state::DeviceState;

/// Placeholder for fields the device never reported, kept identical to the
/// value show-commands historically rendered.
pub const NOT_AVAILABLE: &str = "N/A";

/// One published record per device, keyed for idempotent overwrite.
///
/// The schema is part of the external contract and must stay stable across
/// daemon restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Short device name, the record key ("sda")
    pub device: String,
    pub device_node: String,
    pub class: String,
    pub status: HealthStatus,
    pub reason: String,
    /// Static identity fields echoed from the last good snapshot
    pub model: String,
    pub serial: String,
    pub firmware: String,
    /// Seconds since the Unix epoch when the current status was entered
    pub last_update: u64,
}

impl HealthRecord {
    pub fn from_state(state: &DeviceState) -> Self {
        let text = |name: &str| {
            state
                .last_good
                .as_ref()
                .and_then(|snapshot| snapshot.text(name))
                .unwrap_or(NOT_AVAILABLE)
                .to_string()
        };

        Self {
            device: state.identity.name.clone(),
            device_node: state.identity.device_node.clone(),
            class: state.identity.class.key().to_string(),
            status: state.verdict.status,
            reason: state.verdict.reason.clone(),
            model: text(ATTR_MODEL),
            serial: text(ATTR_SERIAL),
            firmware: text(ATTR_FIRMWARE),
            last_update: state
                .since
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0),
        }
    }

    /// Equality on everything except `last_update`, used for no-op
    /// detection: a record differing only in timestamp is not republished.
    pub fn content_matches(&self, other: &HealthRecord) -> bool {
        self.device == other.device
            && self.device_node == other.device_node
            && self.class == other.class
            && self.status == other.status
            && self.reason == other.reason
            && self.model == other.model
            && self.serial == other.serial
            && self.firmware == other.firmware
    }
}

/// Write capability of the shared state store.
///
/// Writes are keyed by [`HealthRecord::device`] and overwrite any previous
/// record for that device.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn write(&self, record: &HealthRecord) -> Result<(), PublishError>;
}

/// In-memory [`StateStore`] storing serialized records, for tests and
/// embedded use.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<BTreeMap<String, String>>,
    writes: Mutex<u64>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialized record for a device, if one was ever written.
    ///
    /// Every stored payload was produced by [`StateStore::write`], so a
    /// payload that no longer deserializes means the record schema drifted;
    /// that is an invariant violation and panics rather than reading as an
    /// absent record.
    pub fn get(&self, device: &str) -> Option<HealthRecord> {
        let records = self.records.lock();
        let json = records.get(device)?;
        let record = serde_json::from_str(json).unwrap_or_else(|error| {
            panic!("stored record for {device} does not match the record schema: {error}")
        });
        Some(record)
    }

    /// Number of distinct devices with a record.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Total writes accepted, including overwrites.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn write(&self, record: &HealthRecord) -> Result<(), PublishError> {
        let json = serde_json::to_string(record)?;
        self.records.lock().insert(record.device.clone(), json);
        *self.writes.lock() += 1;
        Ok(())
    }
}

/// Publishes device states as deltas against the last published set.
pub struct StatePublisher<S: StateStore> {
    store: S,
    published: BTreeMap<DeviceIdentity, HealthRecord>,
}

impl<S: StateStore> StatePublisher<S> {
    pub fn new(store: S) -> Self {
        Self { store, published: BTreeMap::new() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write every changed record to the store.
    ///
    /// Returns the number of records written this cycle. Per-record write
    /// failures are logged and absorbed; the affected records stay dirty
    /// and are retried next cycle.
    pub async fn publish(&mut self, states: &[DeviceState]) -> usize {
        let mut written = 0;

        for state in states {
            let record = HealthRecord::from_state(state);
            let unchanged = self
                .published
                .get(&state.identity)
                .is_some_and(|previous| previous.content_matches(&record));
            if unchanged {
                continue;
            }

            match self.store.write(&record).await {
                Ok(()) => {
                    debug!(device = %state.identity, status = %record.status, "record published");
                    self.published.insert(state.identity.clone(), record);
                    written += 1;
                }
                Err(error) => {
                    warn!(
                        device = %state.identity,
                        %error,
                        "state store write failed, will retry next cycle"
                    );
                }
            }
        }

        written
    }
}

#[cfg(test)]
mod tests;
