//! Caller-facing bridge orchestrator
//!
//! The bridge wires the synchronization engine, the per-session trackers and
//! the upload queue into one context object with a small non-blocking
//! control surface.
//!
//! # Architecture
//!
//! - A tokio task drives aggregation at 20 Hz by elapsed-time check,
//!   sleeping 10 ms between checks; it never blocks on the poller.
//! - Each aggregation tick reads the latest engine snapshot, advances the
//!   trackers and hands finished payloads to the upload queue.
//! - A session-code change resets every tracker and announces the new
//!   session before per-tick payloads resume.
//! - Any unexpected tick error tears the producer connection down; the
//!   bridge then re-acquires it on a 5 second check interval.
//! - Progress is published as a [`BridgeStatus`] watch feed for front ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicI8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::blocks::BlockProvider;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::outbound::collector::{Collector, HttpCollector};
use crate::outbound::payload::{LapUpload, SessionStart, build_tick};
use crate::outbound::queue::{Outbound, UploadQueue};
use crate::sync::{EngineOptions, SyncEngine};
use crate::trackers::{
    ConsumptionTracker, LapSampleRecorder, SessionClassifier, VehicleStintTracker,
};
use crate::types::{EngineSnapshot, SimKind};

/// Aggregation runs when at least this much time has passed since the
/// previous tick.
const AGGREGATION_INTERVAL: Duration = Duration::from_millis(50);

/// Sleep between elapsed-time checks.
const CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// How often a torn-down producer connection is re-acquired.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Where the bridge currently stands, published through a watch feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeStatus {
    /// The bridge is not running.
    Offline,
    /// Running, but no live session data yet (game absent, frozen, or the
    /// player slot unresolved).
    #[default]
    WaitingForSim,
    /// Session data is live but the player is not active in it.
    Connected,
    /// The player is active but not under local control, so no payloads
    /// are emitted.
    Waiting,
    /// The player is driving; payloads are flowing.
    Live,
    /// A tick failure tore the producer connection down; re-acquisition is
    /// pending.
    Reconnecting,
}

impl BridgeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeStatus::Offline => "offline",
            BridgeStatus::WaitingForSim => "waiting-for-sim",
            BridgeStatus::Connected => "connected",
            BridgeStatus::Waiting => "waiting",
            BridgeStatus::Live => "live",
            BridgeStatus::Reconnecting => "reconnecting",
        }
    }
}

/// State shared between the bridge handle and its aggregation task.
///
/// The engine slot is behind a mutex because the task replaces the engine
/// on reconnect while the handle reads snapshots from it; every critical
/// section is a handful of instructions.
struct Shared {
    engine: Mutex<Option<SyncEngine>>,
    /// -1 none, 0 force inactive, 1 force active.
    state_override: AtomicI8,
    /// -1 none, otherwise the forced player slot index.
    player_override: AtomicI32,
}

impl Shared {
    fn new(engine: SyncEngine) -> Self {
        Self {
            engine: Mutex::new(Some(engine)),
            state_override: AtomicI8::new(-1),
            player_override: AtomicI32::new(-1),
        }
    }

    fn with_engine<T>(&self, f: impl FnOnce(&SyncEngine) -> T) -> Option<T> {
        let guard = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(f)
    }

    fn snapshot(&self) -> Option<Arc<EngineSnapshot>> {
        self.with_engine(|engine| engine.snapshot())
    }

    fn take_engine(&self) -> Option<SyncEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn store_engine(&self, engine: SyncEngine) {
        engine.set_player_override(self.player_override());
        let mut guard = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(engine);
    }

    fn has_engine(&self) -> bool {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn state_override(&self) -> Option<bool> {
        match self.state_override.load(Ordering::Relaxed) {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    fn player_override(&self) -> Option<usize> {
        match self.player_override.load(Ordering::Relaxed) {
            index if index >= 0 => Some(index as usize),
            _ => None,
        }
    }
}

/// The bridge context object.
///
/// Owns the synchronization engine, the per-session trackers, the session
/// classifier and the upload queue, and runs the aggregation loop on a
/// tokio task. Must be started from within a tokio runtime.
pub struct Bridge {
    shared: Arc<Shared>,
    status: watch::Receiver<BridgeStatus>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Starts the bridge against the live producer with an HTTP collector,
    /// both built from the configuration.
    pub fn start(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let collector = Arc::new(HttpCollector::new(
            config.collector.base_url.clone(),
            config.collector.email.clone(),
            config.collector.password.clone(),
        ));
        Self::start_with(config, platform_provider()?, collector)
    }

    /// Starts the bridge with an explicit block provider and collector.
    pub fn start_with(
        config: BridgeConfig,
        provider: Arc<dyn BlockProvider>,
        collector: Arc<dyn Collector>,
    ) -> Result<Self> {
        config.validate()?;
        let options = config.engine_options();
        let engine = SyncEngine::start(provider.clone(), options.clone())?;
        let shared = Arc::new(Shared::new(engine));
        let queue = UploadQueue::start(collector, config.queue_capacity);
        let (status_tx, status_rx) = watch::channel(BridgeStatus::WaitingForSim);
        let cancel = CancellationToken::new();

        let worker = AggregationWorker {
            shared: shared.clone(),
            provider,
            options,
            queue,
            status: status_tx,
            consumption: ConsumptionTracker::default(),
            stints: VehicleStintTracker::default(),
            recorder: LapSampleRecorder::new(Default::default()),
            classifier: SessionClassifier::default(),
            team_id: config.team_id(),
            driver: config.driver.clone(),
            record_laps: config.record_laps,
        };
        let task = tokio::spawn(worker.run(cancel.clone()));

        Ok(Self { shared, status: status_rx, cancel, task: Some(task) })
    }

    /// Current bridge status.
    pub fn status(&self) -> BridgeStatus {
        *self.status.borrow()
    }

    /// Status feed for front ends. Yields the current status immediately,
    /// then every change.
    pub fn status_stream(&self) -> impl Stream<Item = BridgeStatus> + 'static {
        WatchStream::new(self.status.clone())
    }

    /// Latest engine snapshot, if the producer connection is up.
    pub fn snapshot(&self) -> Option<Arc<EngineSnapshot>> {
        self.shared.snapshot()
    }

    /// Which producer variant is publishing, once session data is live.
    pub fn identifier(&self) -> Option<SimKind> {
        self.snapshot().filter(|snapshot| !snapshot.paused).map(|snapshot| snapshot.info.sim_kind())
    }

    /// Whether synchronized data is currently unavailable.
    pub fn is_paused(&self) -> bool {
        self.shared.with_engine(|engine| engine.is_paused()).unwrap_or(true)
    }

    /// Forces the player to a specific scoring slot, or restores automatic
    /// detection. Survives producer reconnects.
    pub fn set_player_override(&self, index: Option<usize>) {
        let encoded = match index {
            Some(index) => index.min(i32::MAX as usize) as i32,
            None => -1,
        };
        self.shared.player_override.store(encoded, Ordering::Relaxed);
        self.shared.with_engine(|engine| engine.set_player_override(index));
    }

    /// Forces activity detection on or off, or restores automatic
    /// detection.
    pub fn set_state_override(&self, forced: Option<bool>) {
        let encoded = match forced {
            Some(true) => 1,
            Some(false) => 0,
            None => -1,
        };
        self.shared.state_override.store(encoded, Ordering::Relaxed);
    }

    /// Stops the aggregation task and the engine. Bounded by the engine's
    /// stop timeout.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if task.await.is_err() {
                warn!("aggregation task panicked");
            }
        }
        if let Some(engine) = self.shared.take_engine() {
            tokio::task::spawn_blocking(move || engine.stop())
                .await
                .map_err(|_| BridgeError::lifecycle("engine stop task panicked"))??;
        }
        Ok(())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(windows)]
fn platform_provider() -> Result<Arc<dyn BlockProvider>> {
    Ok(Arc::new(crate::blocks::WindowsBlocks::new()))
}

#[cfg(not(windows))]
fn platform_provider() -> Result<Arc<dyn BlockProvider>> {
    Err(BridgeError::unsupported_platform("Live shared memory capture", "Windows"))
}

/// Per-task aggregation state. Everything here is owned by the task; the
/// bridge handle only sees the shared engine slot and the status feed.
struct AggregationWorker {
    shared: Arc<Shared>,
    provider: Arc<dyn BlockProvider>,
    options: EngineOptions,
    queue: UploadQueue,
    status: watch::Sender<BridgeStatus>,
    consumption: ConsumptionTracker,
    stints: VehicleStintTracker,
    recorder: LapSampleRecorder,
    classifier: SessionClassifier,
    team_id: String,
    driver: String,
    record_laps: bool,
}

impl AggregationWorker {
    async fn run(mut self, cancel: CancellationToken) {
        info!("bridge aggregation task started");
        let mut last_tick = Instant::now() - AGGREGATION_INTERVAL;
        let mut next_reconnect = Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(CHECK_INTERVAL) => {}
            }
            if last_tick.elapsed() < AGGREGATION_INTERVAL {
                continue;
            }
            last_tick = Instant::now();

            if !self.shared.has_engine() {
                if Instant::now() >= next_reconnect {
                    next_reconnect = Instant::now() + RECONNECT_INTERVAL;
                    self.reacquire();
                }
                continue;
            }

            match self.tick() {
                Ok(status) => self.publish(status),
                Err(err) => {
                    error!(error = %err, "aggregation tick failed, tearing down producer connection");
                    self.teardown().await;
                    next_reconnect = Instant::now() + RECONNECT_INTERVAL;
                    self.publish(BridgeStatus::Reconnecting);
                }
            }
        }
        self.queue.shutdown();
        self.publish(BridgeStatus::Offline);
        info!("bridge aggregation task stopped");
    }

    fn publish(&self, next: BridgeStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                info!(status = next.as_str(), "bridge status changed");
                *current = next;
                true
            }
        });
    }

    /// One aggregation pass. Any error here is treated as a broken producer
    /// connection by the caller.
    fn tick(&mut self) -> anyhow::Result<BridgeStatus> {
        let snapshot = self.shared.snapshot().context("engine snapshot unavailable")?;

        if snapshot.paused || snapshot.player_index.is_none() {
            return Ok(BridgeStatus::WaitingForSim);
        }

        if let Some(context) = self.classifier.observe(snapshot.info.session_code, &self.team_id) {
            self.consumption.reset();
            self.stints.reset();
            self.recorder.reset();
            let car = snapshot
                .player_scoring
                .as_ref()
                .map(|vehicle| vehicle.vehicle_name.clone())
                .unwrap_or_default();
            self.queue.submit(Outbound::SessionStart(SessionStart {
                session_id: context.history_id.clone(),
                phase: context.phase,
                team_id: self.team_id.clone(),
                driver: self.driver.clone(),
                track: snapshot.info.track_name.clone(),
                car,
            }));
        }

        let ignition =
            snapshot.player_telemetry.as_ref().is_some_and(|telemetry| telemetry.ignition_on());
        let detected = snapshot.info.in_realtime || ignition;
        let active = self.shared.state_override().unwrap_or(detected);
        if !active {
            return Ok(BridgeStatus::Connected);
        }

        let driving =
            snapshot.player_scoring.as_ref().is_some_and(|vehicle| vehicle.is_locally_driven());
        if !driving {
            return Ok(BridgeStatus::Waiting);
        }

        let mut stints = HashMap::with_capacity(snapshot.vehicles.len());
        for vehicle in &snapshot.vehicles {
            let report = self.stints.update(
                vehicle.id,
                vehicle.total_laps,
                vehicle.in_pits,
                vehicle.num_pitstops,
            );
            stints.insert(vehicle.id, report);
        }

        if let (Some(telemetry), Some(player)) =
            (snapshot.player_telemetry.as_ref(), snapshot.player_scoring.as_ref())
        {
            self.consumption.observe(
                telemetry.lap_number,
                telemetry.fuel,
                telemetry.virtual_energy,
                player.in_pits,
            );
            if self.record_laps {
                if let Some(lap) = self.recorder.tick(telemetry, player) {
                    let context =
                        self.classifier.current().context("completed lap without a session")?;
                    self.queue.submit(Outbound::Lap(LapUpload {
                        session_id: context.history_id.clone(),
                        lap_number: lap.lap_number,
                        driver: self.driver.clone(),
                        lap_time: lap.lap_time,
                        samples: lap.samples,
                    }));
                }
            }
        }

        let context = self.classifier.current().context("live tick without a session")?;
        let payload = build_tick(
            snapshot.as_ref(),
            context,
            self.consumption.stats(),
            &stints,
            &self.team_id,
            &self.driver,
        );
        self.queue.submit(Outbound::Tick(payload));
        Ok(BridgeStatus::Live)
    }

    async fn teardown(&mut self) {
        // A partially recorded lap is useless after a connection gap.
        self.recorder.reset();
        if let Some(engine) = self.shared.take_engine() {
            match tokio::task::spawn_blocking(move || engine.stop()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "engine stop failed during teardown"),
                Err(_) => warn!("engine stop task panicked during teardown"),
            }
        }
    }

    fn reacquire(&mut self) {
        match SyncEngine::start(self.provider.clone(), self.options.clone()) {
            Ok(engine) => {
                self.shared.store_engine(engine);
                self.publish(BridgeStatus::WaitingForSim);
                info!("producer connection re-acquired");
            }
            Err(err) => {
                warn!(error = %err, "producer connection re-acquisition failed");
            }
        }
    }
}
