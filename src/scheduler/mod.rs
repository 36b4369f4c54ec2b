//! Fixed-interval poll loop driving the whole engine.
//!
//! One [`PollScheduler`] owns the device registry and the publisher. Each
//! cycle it fans probe fetches out over a bounded number of concurrent
//! tasks, applies the outcomes to the per-device state machines strictly
//! sequentially, and hands the full state set to the publisher. A slow
//! device can therefore only cost its own timeout budget, and a single
//! device's transitions are never applied concurrently with themselves.
//!
//! Shutdown is cooperative: the [`ShutdownHandle`] flips a watch channel,
//! in-flight probes finish (or hit their timeouts) and their outcomes are
//! discarded, and the loop exits without applying or publishing anything
//! further.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::classify::HealthClassifier;
use crate::config::MonitorConfig;
use crate::device::DeviceIdentity;
use crate::error::ProbeError;
use crate::probe::{Clock, DeviceCatalog, DeviceProbe, FetchOutcome, RetryPolicy, TokioClock};
use crate::publish::{StatePublisher, StateStore};
use crate::state::DeviceRegistry;

/// Requests a graceful stop of a running [`PollScheduler`].
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // Receiver may already be gone if the loop exited on its own.
        let _ = self.tx.send(true);
    }
}

/// Summary of one poll cycle, mainly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub devices_polled: usize,
    pub unavailable: usize,
    pub records_written: usize,
}

/// Drives periodic polling of every known device.
pub struct PollScheduler<S: StateStore> {
    poll_interval: Duration,
    max_concurrent_probes: usize,
    probe: Arc<dyn DeviceProbe>,
    catalog: Arc<dyn DeviceCatalog>,
    retry: RetryPolicy,
    classifier: HealthClassifier,
    registry: DeviceRegistry,
    publisher: StatePublisher<S>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl<S: StateStore> PollScheduler<S> {
    pub fn new(
        config: MonitorConfig,
        probe: Arc<dyn DeviceProbe>,
        catalog: Arc<dyn DeviceCatalog>,
        store: S,
    ) -> (Self, ShutdownHandle) {
        Self::with_clock(config, probe, catalog, store, Arc::new(TokioClock))
    }

    /// Inject a clock for deterministic tests.
    pub fn with_clock(
        config: MonitorConfig,
        probe: Arc<dyn DeviceProbe>,
        catalog: Arc<dyn DeviceCatalog>,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> (Self, ShutdownHandle) {
        let (tx, rx) = watch::channel(false);
        let scheduler = Self {
            poll_interval: config.poll_interval,
            max_concurrent_probes: config.max_concurrent_probes.max(1),
            probe,
            catalog,
            retry: RetryPolicy::with_clock(config.retry, Arc::clone(&clock)),
            classifier: HealthClassifier::new(config.thresholds),
            registry: DeviceRegistry::new(config.error_debounce_cycles),
            publisher: StatePublisher::new(store),
            clock,
            shutdown: rx,
        };
        (scheduler, ShutdownHandle { tx })
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn publisher(&self) -> &StatePublisher<S> {
        &self.publisher
    }

    /// Enumerate platform devices and merge the result into the registry.
    ///
    /// New devices get fresh state machines; devices that vanished are
    /// marked NOT_AVAILABLE but keep their records. Returns the number of
    /// newly added devices.
    pub async fn rescan(&mut self) -> Result<usize, ProbeError> {
        let discovered = self.catalog.list_devices().await?;
        let now = self.clock.now();
        self.registry.mark_missing(&discovered, now);
        let added = self.registry.absorb_discovery(discovered, now);
        if added > 0 {
            info!(added, total = self.registry.len(), "discovery merged into registry");
        }
        Ok(added)
    }

    /// Execute one full poll cycle: fetch, classify, apply, publish.
    ///
    /// A shutdown requested while probes are in flight discards the
    /// fetched outcomes; nothing is applied or published afterwards.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let identities = self.registry.identities();
        let devices_polled = identities.len();

        let probe = Arc::clone(&self.probe);
        let retry = &self.retry;
        let outcomes: Vec<(DeviceIdentity, FetchOutcome)> = stream::iter(identities)
            .map(|identity| {
                let probe = Arc::clone(&probe);
                async move {
                    let outcome = retry.fetch(probe.as_ref(), &identity).await;
                    (identity, outcome)
                }
            })
            .buffer_unordered(self.max_concurrent_probes)
            .collect()
            .await;

        // A shutdown that lands while probes are in flight lets them
        // finish, but their outcomes must not reach the state machines
        // or the store.
        if *self.shutdown.borrow() {
            debug!("shutdown requested mid-cycle, discarding poll results");
            return CycleReport { devices_polled, ..CycleReport::default() };
        }

        let now = self.clock.now();
        let mut unavailable = 0;
        for (identity, outcome) in outcomes {
            match outcome {
                FetchOutcome::Snapshot(snapshot) => {
                    let verdict = self.classifier.classify(&identity.class, &snapshot);
                    if let Some(machine) = self.registry.machine_mut(&identity) {
                        machine.observe(verdict, now);
                    }
                }
                FetchOutcome::Unavailable { last_error } => {
                    unavailable += 1;
                    if let Some(machine) = self.registry.machine_mut(&identity) {
                        machine.observe_unavailable(format!("probe failed: {last_error}"), now);
                    }
                }
            }
        }

        let states = self.registry.states();
        let records_written = self.publisher.publish(&states).await;

        CycleReport { devices_polled, unavailable, records_written }
    }

    /// Run the poll loop until shutdown is requested.
    ///
    /// Performs initial discovery when the registry is still empty. A
    /// cycle that overruns the interval logs a warning; the next cycle
    /// then starts immediately rather than stacking up.
    pub async fn run(mut self) {
        if self.registry.is_empty() {
            if let Err(error) = self.rescan().await {
                error!(%error, "initial device discovery failed, starting with empty registry");
            }
        }

        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            devices = self.registry.len(),
            interval = ?self.poll_interval,
            "storage health poll loop started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped handle counts as a shutdown request too.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested, stopping poll loop");
                        break;
                    }
                }
                _ = interval.tick() => {
                    let started = Instant::now();
                    let report = self.run_cycle().await;
                    debug!(?report, "poll cycle finished");

                    let elapsed = started.elapsed();
                    if elapsed > self.poll_interval {
                        warn!(
                            ?elapsed,
                            interval = ?self.poll_interval,
                            "poll cycle overran the interval"
                        );
                    }
                }
            }
        }
    }
}
