//! storage-healthd - health monitoring engine for switch-local storage
//!
//! This crate implements the polling-and-health-evaluation core of a
//! storage health daemon: it periodically queries platform storage devices
//! (SSD/eMMC) for telemetry, classifies the readings against per-class
//! threshold tables, tracks per-device state with flap suppression, and
//! publishes a consistent health record set to a shared state store.
//!
//! # Components
//!
//! - **Probe capability** ([`probe::DeviceProbe`], [`probe::DeviceCatalog`]):
//!   narrow interfaces the platform plugin layer implements
//! - **Retry policy** ([`probe::RetryPolicy`]): bounded retries with backoff,
//!   turning flaky hardware access into a definitive per-cycle outcome
//! - **Classifier** ([`classify::HealthClassifier`]): pure threshold rules
//!   mapping a snapshot to OK / WARNING / ERROR / NOT_AVAILABLE
//! - **State machines** ([`state::DeviceStateMachine`]): per-device history
//!   with debounced ERROR entry and immediate recovery reporting
//! - **Scheduler** ([`scheduler::PollScheduler`]): the fixed-interval loop
//!   with bounded probe fan-out
//! - **Publisher** ([`publish::StatePublisher`]): delta writes against the
//!   [`publish::StateStore`] contract
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::SystemTime;
//!
//! use async_trait::async_trait;
//! use storage_healthd::config::MonitorConfig;
//! use storage_healthd::device::{constants::ATTR_HEALTH, DeviceClass, DeviceIdentity, RawSnapshot};
//! use storage_healthd::error::ProbeError;
//! use storage_healthd::probe::{DeviceCatalog, DeviceProbe};
//! use storage_healthd::publish::MemoryStateStore;
//! use storage_healthd::scheduler::PollScheduler;
//!
//! struct Platform;
//!
//! #[async_trait]
//! impl DeviceProbe for Platform {
//!     async fn probe(&self, _id: &DeviceIdentity) -> Result<RawSnapshot, ProbeError> {
//!         // Real platforms shell out to smartctl/nvme-cli here.
//!         Ok(RawSnapshot::new(SystemTime::now()).with_attribute(ATTR_HEALTH, 91.6))
//!     }
//! }
//!
//! #[async_trait]
//! impl DeviceCatalog for Platform {
//!     async fn list_devices(&self) -> Result<Vec<DeviceIdentity>, ProbeError> {
//!         Ok(vec![DeviceIdentity::new("sda", "/dev/sda", DeviceClass::Ata)])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (scheduler, handle) = PollScheduler::new(
//!         MonitorConfig::default(),
//!         Arc::new(Platform),
//!         Arc::new(Platform),
//!         MemoryStateStore::new(),
//!     );
//!     let loop_task = tokio::spawn(scheduler.run());
//!     // Daemon bootstrap wires signal handling to `handle.shutdown()`.
//!     handle.shutdown();
//!     let _ = loop_task.await;
//! }
//! ```
//!
//! # Error handling
//!
//! Probe failures ([`error::ProbeError`]) are absorbed entirely by the
//! retry policy; callers only ever see a snapshot or an unavailable
//! outcome. State-store failures ([`error::PublishError`]) are logged and
//! retried on the next cycle. No error in this crate is fatal: the engine
//! keeps running and keeps publishing its best-known state.
//!
//! # Concurrency
//!
//! Probes within a cycle run on a bounded set of tasks; everything that
//! mutates state runs sequentially on the scheduler task, so device state
//! needs no locking and per-device transitions are strictly ordered.

pub mod classify;
pub mod config;
pub mod device;
pub mod error;
pub mod probe;
pub mod publish;
pub mod scheduler;
pub mod state;

/// Re-export of the types most integrations need.
pub mod prelude {
    pub use crate::classify::{HealthClassifier, HealthStatus, HealthVerdict, ThresholdTable};
    pub use crate::config::MonitorConfig;
    pub use crate::device::{AttributeValue, DeviceClass, DeviceIdentity, RawSnapshot};
    pub use crate::error::{ProbeError, PublishError};
    pub use crate::probe::{DeviceCatalog, DeviceProbe, FetchOutcome, RetryConfig, RetryPolicy};
    pub use crate::publish::{HealthRecord, MemoryStateStore, StatePublisher, StateStore};
    pub use crate::scheduler::{CycleReport, PollScheduler, ShutdownHandle};
    pub use crate::state::{DeviceRegistry, DeviceState, DeviceStateMachine};
}
