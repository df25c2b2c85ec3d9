//! Bounded submit-and-forget upload queue
//!
//! The aggregation loop hands records to the queue and moves on; a single
//! worker task drains them into the collector. The channel is bounded and
//! a full queue drops the newest record, so a stalled collector can never
//! back-pressure the tick loop. Delivery failures are logged and dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::outbound::collector::Collector;
use crate::outbound::payload::{LapUpload, SessionStart, TickPayload};

/// One queued record.
#[derive(Debug, Clone)]
pub enum Outbound {
    SessionStart(SessionStart),
    Tick(TickPayload),
    Lap(LapUpload),
}

impl Outbound {
    fn kind(&self) -> &'static str {
        match self {
            Outbound::SessionStart(_) => "session start",
            Outbound::Tick(_) => "tick",
            Outbound::Lap(_) => "lap",
        }
    }
}

/// Handle to the queue and its worker task.
///
/// Dropping the handle (or calling [`UploadQueue::shutdown`]) cancels the
/// worker without draining; in-flight and queued records are abandoned.
pub struct UploadQueue {
    tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
}

impl UploadQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(collector: Arc<dyn Collector>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        tokio::spawn(worker(collector, rx, cancel.clone()));
        Self { tx, cancel }
    }

    /// Enqueues a record without waiting. Returns whether it was accepted;
    /// a full or closed queue drops it.
    pub fn submit(&self, record: Outbound) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                debug!(kind = record.kind(), "upload queue full, record dropped");
                false
            }
            Err(TrySendError::Closed(record)) => {
                debug!(kind = record.kind(), "upload queue closed, record dropped");
                false
            }
        }
    }

    /// Stops the worker without draining pending records.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for UploadQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn worker(
    collector: Arc<dyn Collector>,
    mut rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
) {
    info!("upload worker started");
    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            record = rx.recv() => match record {
                Some(record) => record,
                None => break,
            },
        };

        let result = match &record {
            Outbound::SessionStart(start) => collector.announce_session(start).await,
            Outbound::Tick(payload) => collector.submit_tick(payload).await,
            Outbound::Lap(lap) => collector.upload_lap(lap).await,
        };
        if let Err(err) = result {
            warn!(kind = record.kind(), error = %err, "delivery failed, record dropped");
        }
    }
    info!("upload worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::outbound::collector::RecordingCollector;
    use crate::types::SessionPhase;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn start_record(n: u32) -> Outbound {
        Outbound::SessionStart(SessionStart {
            session_id: format!("t_RACE_{}", n),
            phase: SessionPhase::Race,
            team_id: "t".to_string(),
            driver: "d".to_string(),
            track: "Spa".to_string(),
            car: "963".to_string(),
        })
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn records_flow_through_to_the_collector() {
        let collector = Arc::new(RecordingCollector::new());
        let queue = UploadQueue::start(collector.clone(), 8);

        assert!(queue.submit(start_record(1)));
        assert!(queue.submit(start_record(2)));
        assert!(wait_until(|| collector.session_starts().len() == 2).await);
        assert_eq!(collector.session_starts()[0].session_id, "t_RACE_1");
    }

    /// Collector that holds every delivery until a permit is released.
    struct GatedCollector {
        gate: Semaphore,
        entered: AtomicUsize,
        inner: RecordingCollector,
    }

    impl GatedCollector {
        fn closed() -> Self {
            Self {
                gate: Semaphore::new(0),
                entered: AtomicUsize::new(0),
                inner: RecordingCollector::new(),
            }
        }
    }

    #[async_trait]
    impl Collector for GatedCollector {
        async fn announce_session(&self, start: &SessionStart) -> Result<()> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await;
            self.inner.announce_session(start).await
        }

        async fn submit_tick(&self, payload: &TickPayload) -> Result<()> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await;
            self.inner.submit_tick(payload).await
        }

        async fn upload_lap(&self, lap: &LapUpload) -> Result<()> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await;
            self.inner.upload_lap(lap).await
        }
    }

    #[tokio::test]
    async fn full_queue_drops_the_newest_record() {
        let collector = Arc::new(GatedCollector::closed());
        let queue = UploadQueue::start(collector.clone(), 2);

        // First record reaches the worker and blocks on the gate.
        assert!(queue.submit(start_record(1)));
        assert!(wait_until(|| collector.entered.load(Ordering::SeqCst) == 1).await);

        // Two more fill the channel, the fourth has nowhere to go.
        assert!(queue.submit(start_record(2)));
        assert!(queue.submit(start_record(3)));
        assert!(!queue.submit(start_record(4)));

        collector.gate.add_permits(16);
        assert!(wait_until(|| collector.inner.session_starts().len() == 3).await);
        let ids: Vec<_> =
            collector.inner.session_starts().iter().map(|s| s.session_id.clone()).collect();
        assert_eq!(ids, vec!["t_RACE_1", "t_RACE_2", "t_RACE_3"]);
    }

    #[tokio::test]
    async fn shutdown_abandons_pending_records() {
        let collector = Arc::new(GatedCollector::closed());
        let queue = UploadQueue::start(collector.clone(), 8);
        queue.submit(start_record(1));
        queue.submit(start_record(2));

        queue.shutdown();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Submitting after shutdown is a quiet drop, never a panic.
        collector.gate.add_permits(16);
        tokio::time::sleep(Duration::from_millis(30)).await;
        queue.submit(start_record(3));
        assert!(collector.inner.session_starts().len() < 3);
    }
}
