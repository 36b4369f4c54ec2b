//! Per-device health state tracking with flap suppression.
//!
//! One [`DeviceStateMachine`] exists per discovered device for the life of
//! the daemon. It consumes one classifier verdict (or an unavailable
//! outcome) per poll cycle and owns its [`DeviceState`] exclusively, so no
//! locking is needed: the scheduler applies outcomes sequentially.
//!
//! Entering ERROR is debounced: the condition must persist for a
//! configurable number of consecutive cycles before the held state changes,
//! which suppresses single-cycle sensor glitches. Leaving ERROR is
//! reported on the first clean cycle so recovery is never masked.
//! NOT_AVAILABLE is unambiguous (the retry budget for the cycle is already
//! spent) and is never debounced.

use std::collections::BTreeMap;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::classify::{HealthStatus, HealthVerdict};
use crate::device::{DeviceIdentity, RawSnapshot};

/// Mutable per-device record, owned by its state machine.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub identity: DeviceIdentity,
    /// Currently held verdict (post-debounce)
    pub verdict: HealthVerdict,
    /// When the current status was entered; never decreases
    pub since: SystemTime,
    /// Consecutive cycles the device has been unavailable
    pub consecutive_failures: u32,
    /// Last snapshot that produced a successful classification
    pub last_good: Option<RawSnapshot>,
}

/// State machine for one device.
#[derive(Debug)]
pub struct DeviceStateMachine {
    state: DeviceState,
    error_debounce_cycles: u32,
    /// Consecutive ERROR classifications while not yet holding ERROR
    pending_error_cycles: u32,
}

impl DeviceStateMachine {
    pub fn new(identity: DeviceIdentity, error_debounce_cycles: u32, now: SystemTime) -> Self {
        Self {
            state: DeviceState {
                identity,
                verdict: HealthVerdict::unknown(),
                since: now,
                consecutive_failures: 0,
                last_good: None,
            },
            error_debounce_cycles: error_debounce_cycles.max(1),
            pending_error_cycles: 0,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Feed one cycle's classifier verdict into the machine.
    pub fn observe(&mut self, verdict: HealthVerdict, now: SystemTime) {
        self.state.consecutive_failures = 0;
        if let Some(snapshot) = &verdict.snapshot {
            self.state.last_good = Some(snapshot.clone());
        }

        if verdict.status == HealthStatus::Error && self.state.verdict.status != HealthStatus::Error
        {
            self.pending_error_cycles += 1;
            if self.pending_error_cycles < self.error_debounce_cycles {
                debug!(
                    device = %self.state.identity,
                    streak = self.pending_error_cycles,
                    needed = self.error_debounce_cycles,
                    "holding back ERROR transition"
                );
                return;
            }
        }
        if verdict.status != HealthStatus::Error {
            self.pending_error_cycles = 0;
        }

        self.transition(verdict, now);
    }

    /// Feed an unavailable outcome (retry budget exhausted or device
    /// absent from discovery).
    pub fn observe_unavailable(&mut self, reason: impl Into<String>, now: SystemTime) {
        self.state.consecutive_failures += 1;
        self.pending_error_cycles = 0;
        self.transition(HealthVerdict::unavailable(reason), now);
    }

    fn transition(&mut self, verdict: HealthVerdict, now: SystemTime) {
        if self.state.verdict.status != verdict.status {
            info!(
                device = %self.state.identity,
                from = %self.state.verdict.status,
                to = %verdict.status,
                reason = %verdict.reason,
                "health transition"
            );
            // Entry timestamps are monotonically non-decreasing per device.
            self.state.since = self.state.since.max(now);
        }
        self.state.verdict = verdict;
    }
}

/// Owned table of every known device's state machine.
///
/// Devices are added at discovery (or rescan) and never silently dropped;
/// a device that disappears from discovery is marked NOT_AVAILABLE and its
/// record preserved.
#[derive(Debug)]
pub struct DeviceRegistry {
    machines: BTreeMap<DeviceIdentity, DeviceStateMachine>,
    error_debounce_cycles: u32,
}

impl DeviceRegistry {
    pub fn new(error_debounce_cycles: u32) -> Self {
        Self { machines: BTreeMap::new(), error_debounce_cycles }
    }

    /// Merge a discovery result: unknown identities get fresh machines,
    /// known ones keep their state.
    pub fn absorb_discovery(&mut self, discovered: Vec<DeviceIdentity>, now: SystemTime) -> usize {
        let mut added = 0;
        for identity in discovered {
            if !self.machines.contains_key(&identity) {
                debug!(device = %identity, class = %identity.class, "device discovered");
                self.machines.insert(
                    identity.clone(),
                    DeviceStateMachine::new(identity, self.error_debounce_cycles, now),
                );
                added += 1;
            }
        }
        added
    }

    /// Mark devices absent from the given discovery result as unavailable.
    pub fn mark_missing(&mut self, present: &[DeviceIdentity], now: SystemTime) {
        for (identity, machine) in &mut self.machines {
            if !present.contains(identity)
                && machine.state().verdict.status != HealthStatus::NotAvailable
            {
                machine.observe_unavailable("absent from discovery", now);
            }
        }
    }

    pub fn identities(&self) -> Vec<DeviceIdentity> {
        self.machines.keys().cloned().collect()
    }

    pub fn machine_mut(&mut self, identity: &DeviceIdentity) -> Option<&mut DeviceStateMachine> {
        self.machines.get_mut(identity)
    }

    pub fn states(&self) -> Vec<DeviceState> {
        self.machines.values().map(|machine| machine.state().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
