//! Batching event queue
//!
//! Watcher threads push events with [`EventQueueProcessor::enqueue`], which
//! only takes a short mutex. A background task swaps the pending batch out
//! every interval and feeds each event to an async [`EventHandler`]. Bursts
//! (a build touching hundreds of files) collapse into one batch and handlers
//! never run re-entrantly on the watcher thread.
//!
//! Ordering: events of one batch are handled in enqueue order, and a batch is
//! fully handled before the next one is swapped out.

use anyhow::Result;
use async_trait::async_trait;
use ct_core::{Error, FileChangeEvent};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Consumer of drained events
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Current changed-files snapshot, fetched once per batch
    async fn changed_files(&self) -> Result<HashSet<PathBuf>>;

    /// Handle one event of the batch
    async fn process_event(&self, event: &FileChangeEvent, changed: &HashSet<PathBuf>) -> Result<()>;
}

struct Shared {
    pending: Mutex<Vec<FileChangeEvent>>,
    handler: Arc<dyn EventHandler>,
    /// Serializes batch passes between the loop and `flush`
    pass: tokio::sync::Mutex<()>,
}

struct Running {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

/// Periodic batch processor for file change events
pub struct EventQueueProcessor {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl EventQueueProcessor {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Vec::new()),
                handler,
                pass: tokio::sync::Mutex::new(()),
            }),
            running: Mutex::new(None),
        }
    }

    /// Queue an event for the next batch. Never blocks on handlers.
    pub fn enqueue(&self, event: FileChangeEvent) {
        trace!(event = %event, "Event queued");
        self.shared.pending.lock().push(event);
    }

    /// A cloneable sink suitable for watcher callbacks
    pub fn sink(&self) -> impl Fn(FileChangeEvent) + Send + Sync + 'static {
        let shared = Arc::clone(&self.shared);
        move |event| shared.pending.lock().push(event)
    }

    /// Number of events waiting for the next batch
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Start draining every `interval`
    ///
    /// Must be called from within a tokio runtime. Starting twice logs a
    /// warning and keeps the existing loop.
    pub fn start(&self, interval: Duration) -> ct_core::Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidArgument("queue interval must be non-zero"));
        }

        let mut running = self.running.lock();
        if running.is_some() {
            warn!("Event queue processor already started");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            interval,
            cancel.clone(),
        ));

        debug!(interval_ms = interval.as_millis() as u64, "Event queue processor started");
        *running = Some(Running {
            cancel,
            _task: task,
        });
        Ok(())
    }

    /// Stop the loop. A batch already being handled runs to completion.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.cancel.cancel();
            debug!("Event queue processor stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Drain the pending batch now, on the caller's task
    ///
    /// Returns the number of events handed to the handler.
    pub async fn flush(&self) -> usize {
        self.shared.drain().await
    }
}

impl Drop for EventQueueProcessor {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

async fn run_loop(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                shared.drain().await;
            }
        }
    }

    trace!("Event queue loop exited");
}

impl Shared {
    async fn drain(&self) -> usize {
        let _pass = self.pass.lock().await;

        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return 0;
        }

        let changed = match self.handler.changed_files().await {
            Ok(changed) => changed,
            Err(e) => {
                warn!(events = batch.len(), error = %e, "Failed to get changed files, skipping batch");
                return 0;
            }
        };

        debug!(events = batch.len(), tracked = changed.len(), "Processing event batch");

        for event in &batch {
            let outcome = AssertUnwindSafe(self.handler.process_event(event, &changed))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(event = %event, error = %e, "Failed to process file change event");
                }
                Err(_) => {
                    warn!(event = %event, "Handler panicked while processing file change event");
                }
            }
        }

        batch.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::testing::capture_logs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<FileChangeEvent>>,
        snapshots: AtomicUsize,
        fail_on: Option<PathBuf>,
        fail_snapshots: AtomicUsize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn changed_files(&self) -> Result<HashSet<PathBuf>> {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            if self.fail_snapshots.load(Ordering::SeqCst) > 0 {
                self.fail_snapshots.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("snapshot unavailable");
            }
            Ok(HashSet::new())
        }

        async fn process_event(&self, event: &FileChangeEvent, _changed: &HashSet<PathBuf>) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.seen.lock().push(event.clone());
            if self.fail_on.as_deref() == Some(event.path.as_path()) {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn events(n: usize) -> Vec<FileChangeEvent> {
        (0..n)
            .map(|i| FileChangeEvent::changed(format!("/repo/file{}.ts", i)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_events_handled_in_order_despite_failure() {
        let (logs, _guard) = capture_logs();
        let recorder = Arc::new(Recorder {
            fail_on: Some(PathBuf::from("/repo/file2.ts")),
            ..Default::default()
        });
        let queue = EventQueueProcessor::new(recorder.clone());

        let batch = events(5);
        for event in batch.clone() {
            queue.enqueue(event);
        }

        queue.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.stop();

        assert_eq!(*recorder.seen.lock(), batch);
        assert_eq!(recorder.snapshots.load(Ordering::SeqCst), 1);
        assert_eq!(logs.count(Level::WARN, "Failed to process file change event"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subsequent_batches_still_processed_after_failure() {
        let recorder = Arc::new(Recorder {
            fail_on: Some(PathBuf::from("/repo/file0.ts")),
            ..Default::default()
        });
        let queue = EventQueueProcessor::new(recorder.clone());
        queue.start(Duration::from_millis(10)).unwrap();

        queue.enqueue(FileChangeEvent::changed("/repo/file0.ts"));
        tokio::time::sleep(Duration::from_millis(15)).await;
        queue.enqueue(FileChangeEvent::changed("/repo/file1.ts"));
        tokio::time::sleep(Duration::from_millis(15)).await;

        assert_eq!(recorder.seen.lock().len(), 2);
        assert_eq!(recorder.snapshots.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_handler() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueueProcessor::new(recorder.clone());

        assert_eq!(queue.flush().await, 0);
        assert_eq!(recorder.snapshots.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_during_processing_goes_to_next_batch() {
        let recorder = Arc::new(Recorder {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let queue = Arc::new(EventQueueProcessor::new(recorder.clone()));

        queue.enqueue(FileChangeEvent::created("/repo/a.ts"));
        let flushing = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.flush().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.enqueue(FileChangeEvent::created("/repo/b.ts"));
        assert_eq!(queue.pending_len(), 1);

        assert_eq!(flushing.await.unwrap(), 1);
        assert_eq!(recorder.seen.lock().len(), 1);

        assert_eq!(queue.flush().await, 1);
        assert_eq!(recorder.seen.lock()[1].path, PathBuf::from("/repo/b.ts"));
        assert_eq!(recorder.snapshots.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_failure_skips_batch_and_loop_continues() {
        let (logs, _guard) = capture_logs();
        let recorder = Arc::new(Recorder {
            fail_snapshots: AtomicUsize::new(1),
            ..Default::default()
        });
        let queue = EventQueueProcessor::new(recorder.clone());
        queue.start(Duration::from_millis(10)).unwrap();

        queue.enqueue(FileChangeEvent::changed("/repo/lost.ts"));
        tokio::time::sleep(Duration::from_millis(15)).await;
        queue.enqueue(FileChangeEvent::changed("/repo/kept.ts"));
        tokio::time::sleep(Duration::from_millis(15)).await;

        let seen = recorder.seen.lock().clone();
        assert_eq!(seen, vec![FileChangeEvent::changed("/repo/kept.ts")]);
        assert_eq!(logs.count(Level::WARN, "Failed to get changed files"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_draining() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueueProcessor::new(recorder.clone());
        queue.start(Duration::from_millis(10)).unwrap();
        queue.stop();
        assert!(!queue.is_started());

        queue.enqueue(FileChangeEvent::changed("/repo/a.ts"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(recorder.seen.lock().is_empty());
        assert_eq!(queue.pending_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_running_batch_finish() {
        let recorder = Arc::new(Recorder {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let queue = EventQueueProcessor::new(recorder.clone());
        let batch = events(3);
        for event in batch.clone() {
            queue.enqueue(event);
        }

        // First drain at 10ms, done at 70ms
        queue.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(recorder.seen.lock().len(), 0);
        queue.stop();

        queue.enqueue(FileChangeEvent::changed("/repo/late.ts"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(*recorder.seen.lock(), batch);
        assert_eq!(recorder.snapshots.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_double_start_warns_once() {
        let (logs, _guard) = capture_logs();
        let queue = EventQueueProcessor::new(Arc::new(Recorder::default()));

        queue.start(Duration::from_millis(10)).unwrap();
        queue.start(Duration::from_millis(10)).unwrap();

        assert_eq!(logs.count(Level::WARN, "already started"), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let queue = EventQueueProcessor::new(Arc::new(Recorder::default()));
        let err = queue.start(Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!queue.is_started());
    }

    #[tokio::test]
    async fn test_sink_feeds_queue() {
        let queue = EventQueueProcessor::new(Arc::new(Recorder::default()));
        let sink = queue.sink();
        sink(FileChangeEvent::deleted("/repo/a.ts"));
        sink(FileChangeEvent::deleted("/repo/b.ts"));
        assert_eq!(queue.pending_len(), 2);
    }
}
