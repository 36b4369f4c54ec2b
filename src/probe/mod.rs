//! Capability interfaces to the platform collaborator.
//!
//! The engine never performs device I/O itself. It consumes two narrow
//! traits: [`DeviceProbe`] reads one device's telemetry, [`DeviceCatalog`]
//! enumerates the devices present on the platform. Platform plugins
//! implement these per device class (smartctl wrapper, nvme-cli wrapper,
//! sysfs reader) and are selected at discovery time.
//!
//! Both traits are mockable in tests via `mockall`.

mod retry;

pub use retry::{Clock, FetchOutcome, RetryConfig, RetryPolicy, TokioClock};
#[cfg(test)]
pub use retry::MockClock;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::device::{DeviceIdentity, RawSnapshot};
use crate::error::ProbeError;

/// Reads one raw telemetry snapshot from a device.
///
/// Pure query: no caching, no side effects beyond the hardware read. A
/// probe call may block up to the per-attempt timeout imposed by
/// [`RetryPolicy`]; exceeding it is treated as [`ProbeError::Timeout`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn probe(&self, id: &DeviceIdentity) -> Result<RawSnapshot, ProbeError>;
}

/// Enumerates the storage devices present on the platform.
///
/// Called once at startup and again on an explicit rescan. The returned
/// order is preserved so registry iteration stays deterministic.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceCatalog: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceIdentity>, ProbeError>;
}
