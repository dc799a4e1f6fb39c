//! Fixed-interval executor with drop semantics
//!
//! Fires an async action every interval, but never lets two runs overlap and
//! never queues a backlog: a tick that arrives while the previous run is still
//! in flight is discarded. Used to drive periodic reconciliation, where the
//! next tick does an equally authoritative full pass anyway.
//!
//! Lifecycle: Created → Started → Stopped → Started → … → Disposed (terminal).

use ct_core::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// The scheduled work
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Builder for [`DroppingExecutor`]
#[derive(Default)]
pub struct DroppingExecutorBuilder {
    name: Option<String>,
    interval: Option<Duration>,
    action: Option<Action>,
}

impl DroppingExecutorBuilder {
    /// Name used in log fields
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.action = Some(Arc::new(move || action().boxed()));
        self
    }

    /// Validate and build. Fails without constructing anything when the
    /// action is missing or the interval is missing or zero.
    pub fn build(self) -> Result<DroppingExecutor> {
        let action = self
            .action
            .ok_or(Error::InvalidArgument("scheduled executor requires an action"))?;
        let interval = self
            .interval
            .ok_or(Error::InvalidArgument("scheduled executor requires an interval"))?;
        if interval.is_zero() {
            return Err(Error::InvalidArgument("scheduled executor interval must be non-zero"));
        }

        Ok(DroppingExecutor {
            core: Arc::new(Core {
                name: self.name.unwrap_or_else(|| "scheduled-executor".to_string()),
                action,
                in_flight: AtomicBool::new(false),
                completed: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
            interval,
            schedule: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }
}

struct Core {
    name: String,
    action: Action,
    in_flight: AtomicBool,
    completed: AtomicU64,
    dropped: AtomicU64,
}

impl Core {
    /// Run the action unless a previous run is still in flight
    fn fire(self: &Arc<Self>) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(executor = %self.name, "Previous run still in flight, dropping tick");
            return false;
        }

        let guard = InFlight(Arc::clone(self));
        let run = (self.action)();
        tokio::spawn(async move {
            let _guard = guard;
            run.await;
        });
        true
    }
}

/// Releases the in-flight flag when the run ends, including by panic
struct InFlight(Arc<Core>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.completed.fetch_add(1, Ordering::Relaxed);
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Periodic executor that skips ticks while the action is running
pub struct DroppingExecutor {
    core: Arc<Core>,
    interval: Duration,
    schedule: Mutex<Option<CancellationToken>>,
    disposed: AtomicBool,
}

impl DroppingExecutor {
    pub fn builder() -> DroppingExecutorBuilder {
        DroppingExecutorBuilder::default()
    }

    /// Begin firing every interval (first fire one interval from now)
    ///
    /// Must be called from within a tokio runtime. A second start logs a
    /// warning and leaves the existing schedule untouched.
    pub fn start(&self) -> Result<()> {
        let mut schedule = self.schedule.lock();

        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::Disposed("scheduled executor"));
        }

        if schedule.is_some() {
            warn!(executor = %self.core.name, "Scheduled executor already started");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        tokio::spawn(tick_loop(
            Arc::clone(&self.core),
            self.interval,
            cancel.clone(),
        ));
        *schedule = Some(cancel);

        debug!(
            executor = %self.core.name,
            interval_ms = self.interval.as_millis() as u64,
            "Scheduled executor started"
        );
        Ok(())
    }

    /// Stop firing. No-op when not started; allowed after disposal.
    ///
    /// A run already in flight is left to finish.
    pub fn stop(&self) {
        if let Some(cancel) = self.schedule.lock().take() {
            cancel.cancel();
            debug!(executor = %self.core.name, "Scheduled executor stopped");
        }
    }

    /// Run the action right away, subject to the same in-flight guard
    ///
    /// Returns `Ok(false)` when the run was dropped because another is active.
    pub fn trigger(&self) -> Result<bool> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::Disposed("scheduled executor"));
        }
        Ok(self.core.fire())
    }

    /// Stop the timer and mark the executor unusable. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop();
        debug!(executor = %self.core.name, "Scheduled executor disposed");
    }

    pub fn is_started(&self) -> bool {
        self.schedule.lock().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether an action run is currently in flight
    pub fn is_running(&self) -> bool {
        self.core.in_flight.load(Ordering::Acquire)
    }

    /// Runs that have finished (successfully or by panic)
    pub fn completed_runs(&self) -> u64 {
        self.core.completed.load(Ordering::Relaxed)
    }

    /// Ticks discarded because a run was in flight
    pub fn dropped_ticks(&self) -> u64 {
        self.core.dropped.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for DroppingExecutor {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn tick_loop(core: Arc<Core>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                core.fire();
            }
        }
    }

    trace!(executor = %core.name, "Tick loop exited");
}
