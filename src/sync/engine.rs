//! The background sync engine
//!
//! One dedicated thread owns the block set and polls it on an adaptive
//! cadence: slow while the game is absent or frozen, fast while a session
//! is live. Every poll decodes the settled copies, resolves the player and
//! publishes an immutable snapshot through a watch channel. Consumers
//! clone the latest snapshot and never touch poller state.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::blocks::{Block, BlockProvider, BlockSet};
use crate::error::BridgeError;
use crate::schema::decode;
use crate::schema::layout::MAX_VEHICLES;
use crate::sync::locator::{PlayerLocator, PlayerSlots};
use crate::sync::staleness::{StalenessDetector, Transition};
use crate::types::EngineSnapshot;

/// Tuning knobs for the poller. Defaults match live use; tests shrink the
/// durations to keep wall time down.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Poll interval while the game is absent or frozen.
    pub slow_cadence: Duration,
    /// Poll interval while session data is live.
    pub fast_cadence: Duration,
    /// How long the version counter may stall before data counts as frozen.
    pub freeze_after: Duration,
    /// Ceiling for the player resolution retry counter.
    pub locate_retry_limit: u32,
    /// Retry count at which player data is declared paused.
    pub pause_after_retries: u32,
    /// How long `stop` waits for the poller thread to exit.
    pub stop_timeout: Duration,
    /// Producer process id for dedicated server region names.
    pub producer_pid: Option<u32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            slow_cadence: Duration::from_millis(500),
            fast_cadence: Duration::from_millis(10),
            freeze_after: Duration::from_secs(2),
            locate_retry_limit: 6,
            pause_after_retries: 5,
            stop_timeout: Duration::from_secs(1),
            producer_pid: None,
        }
    }
}

enum Command {
    Stop,
}

/// Handle to the running poller thread.
///
/// [`SyncEngine::snapshot`] is cheap (one `Arc` clone) and safe from any
/// thread, sync or async. Dropping the handle asks the thread to stop
/// without waiting; [`SyncEngine::stop`] waits with a bounded timeout.
pub struct SyncEngine {
    options: EngineOptions,
    override_index: Arc<AtomicI32>,
    snapshots: watch::Receiver<Arc<EngineSnapshot>>,
    wake: mpsc::Sender<Command>,
    stopped: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl SyncEngine {
    /// Spawns the poller thread. Returns immediately; attachment to the
    /// shared memory happens on the poll cadence.
    pub fn start(provider: Arc<dyn BlockProvider>, options: EngineOptions) -> Result<Self> {
        let (wake_tx, wake_rx) = mpsc::channel();
        let (stopped_tx, stopped_rx) = mpsc::channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(EngineSnapshot::default()));
        let override_index = Arc::new(AtomicI32::new(-1));

        let worker = PollWorker {
            blocks: BlockSet::new(provider, options.producer_pid),
            staleness: StalenessDetector::new(options.freeze_after),
            locator: PlayerLocator::new(),
            player: None,
            locate_retries: 0,
            paused: false,
            cadence: options.slow_cadence,
            override_index: Arc::clone(&override_index),
            options: options.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("pitlink-sync".to_string())
            .spawn(move || worker.run(wake_rx, snapshot_tx, stopped_tx))
            .map_err(|err| {
                BridgeError::lifecycle(format!("failed to spawn sync poller: {}", err))
            })?;

        Ok(Self {
            options,
            override_index,
            snapshots: snapshot_rx,
            wake: wake_tx,
            stopped: stopped_rx,
            handle: Some(handle),
        })
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Watch channel carrying every published snapshot, for async
    /// consumers that want change notification instead of polling.
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.snapshots.clone()
    }

    /// True while no usable player data is flowing, either because the
    /// feed is frozen or because no vehicle resolves as the player.
    pub fn is_paused(&self) -> bool {
        let snapshot = self.snapshot();
        snapshot.paused || snapshot.player_index.is_none()
    }

    /// Follows the given scoring index instead of the `is_player` flag.
    /// `None` restores the normal scan. Takes effect on the next poll.
    pub fn set_player_override(&self, index: Option<usize>) {
        let value = match index {
            Some(index) => index.min(MAX_VEHICLES - 1) as i32,
            None => -1,
        };
        self.override_index.store(value, Ordering::Relaxed);
    }

    /// Stops the poller and waits for it to exit. On timeout the thread is
    /// left detached and a [`BridgeError::Timeout`] is returned.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.wake.send(Command::Stop);

        // The worker holds the sender end and drops it on exit, so either
        // outcome short of a timeout means the thread is done.
        match self.stopped.recv_timeout(self.options.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => handle
                .join()
                .map_err(|_| BridgeError::lifecycle("sync poller thread panicked")),
            Err(RecvTimeoutError::Timeout) => {
                warn!("sync poller did not stop in time, detaching");
                Err(BridgeError::Timeout { duration: self.options.stop_timeout })
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.wake.send(Command::Stop);
            self.handle = None;
        }
    }
}

struct PollWorker {
    blocks: BlockSet,
    staleness: StalenessDetector,
    locator: PlayerLocator,
    player: Option<PlayerSlots>,
    locate_retries: u32,
    paused: bool,
    cadence: Duration,
    override_index: Arc<AtomicI32>,
    options: EngineOptions,
}

impl PollWorker {
    fn run(
        mut self,
        wake: mpsc::Receiver<Command>,
        snapshots: watch::Sender<Arc<EngineSnapshot>>,
        _stopped: mpsc::Sender<()>,
    ) {
        debug!("sync poller started");
        loop {
            match wake.recv_timeout(self.cadence) {
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.poll_once(&snapshots);
        }
        self.blocks.detach();
        debug!("sync poller stopped");
    }

    fn poll_once(&mut self, snapshots: &watch::Sender<Arc<EngineSnapshot>>) {
        let now = Instant::now();

        if !self.blocks.is_attached() {
            match self.blocks.attach() {
                Ok(()) => info!("shared memory attached"),
                Err(err) => {
                    trace!(error = %err, "shared memory unavailable");
                    self.note_stalled(now, snapshots);
                    return;
                }
            }
        }

        if let Err(err) = self.blocks.refresh() {
            warn!(error = %err, "shared memory lost, will reattach");
            self.cadence = self.options.slow_cadence;
            self.note_stalled(now, snapshots);
            return;
        }

        let scoring = match self.blocks.bytes(Block::Scoring).map(decode::decode_scoring) {
            Some(Ok(block)) => block,
            Some(Err(err)) => {
                warn!(error = %err, "scoring block decode failed");
                self.note_stalled(now, snapshots);
                return;
            }
            None => return,
        };
        let telemetry = match self.blocks.bytes(Block::Telemetry).map(decode::decode_telemetry) {
            Some(Ok(block)) => block,
            Some(Err(err)) => {
                warn!(error = %err, "telemetry block decode failed");
                self.note_stalled(now, snapshots);
                return;
            }
            None => return,
        };

        let extended =
            decode_optional(self.blocks.bytes(Block::Extended), decode::decode_extended, "extended");
        let pit_menu =
            decode_optional(self.blocks.bytes(Block::PitMenu), decode::decode_pit, "pit menu");
        let rules = decode_optional(self.blocks.bytes(Block::Rules), decode::decode_rules, "rules");
        let weather =
            decode_optional(self.blocks.bytes(Block::Weather), decode::decode_weather, "weather");

        let version = scoring.header.version_end;

        // Player resolution runs only while the feed is live; a frozen
        // feed keeps whatever was resolved last.
        if !self.staleness.is_frozen() {
            self.locator.rebuild(&telemetry.vehicles);
            match self.locator.locate(&scoring.vehicles, self.override_index()) {
                Ok(slots) => {
                    if self.player.map(|p| p.id) != Some(slots.id) {
                        debug!(id = %slots.id, slot = slots.scoring_index, "player resolved");
                    }
                    self.player = Some(slots);
                    self.locate_retries = 0;
                    self.paused = false;
                }
                Err(failure) => {
                    self.player = None;
                    if self.locate_retries < self.options.locate_retry_limit {
                        self.locate_retries += 1;
                    }
                    if self.locate_retries == self.options.pause_after_retries {
                        self.paused = true;
                        info!(reason = ?failure, "player data paused");
                    }
                }
            }
        }

        match self.staleness.observe(version, now) {
            Some(Transition::Resumed) => {
                self.cadence = self.options.fast_cadence;
                self.paused = false;
                info!(version, "session data resumed");
            }
            Some(Transition::Frozen) => {
                self.cadence = self.options.slow_cadence;
                self.paused = true;
                info!(version, "session data paused");
            }
            None => {}
        }

        let player_scoring =
            self.player.and_then(|p| scoring.vehicles.get(p.scoring_index).cloned());
        let player_telemetry =
            self.player.and_then(|p| telemetry.vehicles.get(p.telemetry_index).cloned());

        let snapshot = EngineSnapshot {
            version,
            info: scoring.info,
            vehicles: scoring.vehicles,
            extended,
            pit_menu,
            rules,
            weather,
            player_index: self.player.map(|p| p.scoring_index),
            player_scoring,
            player_telemetry,
            paused: self.paused,
        };
        snapshots.send_replace(Arc::new(snapshot));
    }

    /// Keeps the stall clock running on polls that produced no readable
    /// data, so a vanished producer still freezes the feed. The last
    /// snapshot is republished with the paused flag set; its field data is
    /// stale but remains visible.
    fn note_stalled(&mut self, now: Instant, snapshots: &watch::Sender<Arc<EngineSnapshot>>) {
        if self.staleness.observe_stall(now) == Some(Transition::Frozen) {
            self.cadence = self.options.slow_cadence;
            self.paused = true;
            info!("session data paused");
            let mut snapshot = snapshots.borrow().as_ref().clone();
            snapshot.paused = true;
            snapshots.send_replace(Arc::new(snapshot));
        }
    }

    fn override_index(&self) -> Option<usize> {
        let raw = self.override_index.load(Ordering::Relaxed);
        (raw >= 0).then_some(raw as usize)
    }
}

fn decode_optional<T: Default>(
    bytes: Option<&[u8]>,
    decode: impl Fn(&[u8]) -> Result<T>,
    block: &str,
) -> T {
    match bytes.map(decode) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            debug!(block, error = %err, "optional block decode failed");
            T::default()
        }
        None => T::default(),
    }
}
