use crate::config::{DEFAULT_MAX_SAMPLES, DEFAULT_SAMPLING_INTERVAL};
use crate::error::{AppError, Result};
use crate::metrics::history::History;
use crate::metrics::reconstruct::reconstruct_events;
use crate::runtime::source::MetricsSource;
use crate::runtime::types::{GcEvent, Snapshot};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub type SnapshotCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;
pub type EventCallback = Arc<dyn Fn(&GcEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub max_samples: usize,
    /// Keep each snapshot's pause ring in history. Without it a retained
    /// snapshot is ~4 KiB smaller, and pause statistics need events.
    pub retain_pause_buffers: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLING_INTERVAL,
            max_samples: DEFAULT_MAX_SAMPLES,
            retain_pause_buffers: true,
        }
    }
}

/// Hooks invoked after a tick's entries are visible in history.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_snapshot: Option<SnapshotCallback>,
    pub on_event: Option<EventCallback>,
}

impl Callbacks {
    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.on_snapshot = Some(Arc::new(f));
        self
    }

    pub fn on_event(mut self, f: impl Fn(&GcEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(f));
        self
    }
}

struct Shared {
    source: Arc<dyn MetricsSource>,
    config: SamplerConfig,
    history: RwLock<History>,
    running: AtomicBool,
    callbacks: Callbacks,
}

struct RunningTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodically snapshots a [`MetricsSource`] and rebuilds collection events
/// into a bounded history.
///
/// One background task samples; any number of callers may read. Reads return
/// copies, never references into the history.
pub struct Sampler {
    shared: Arc<Shared>,
    task: Mutex<Option<RunningTask>>,
}

impl Sampler {
    pub fn new(source: Arc<dyn MetricsSource>, config: SamplerConfig) -> Self {
        Self::with_callbacks(source, config, Callbacks::default())
    }

    pub fn with_callbacks(
        source: Arc<dyn MetricsSource>,
        mut config: SamplerConfig,
        callbacks: Callbacks,
    ) -> Self {
        config.interval = config.interval.max(MIN_INTERVAL);
        config.max_samples = config.max_samples.max(1);

        Self {
            shared: Arc::new(Shared {
                source,
                history: RwLock::new(History::new(config.max_samples)),
                config,
                running: AtomicBool::new(false),
                callbacks,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.shared.config
    }

    pub fn source_name(&self) -> &str {
        self.shared.source.name()
    }

    /// Starts the background sampling task. It runs until [`Sampler::stop`]
    /// or until `shutdown` resolves.
    pub fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.task.lock();
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(shared.run(stop_rx, shutdown));

        // A task left behind by an external cancellation has already exited.
        if let Some(stale) = slot.replace(RunningTask {
            stop: stop_tx,
            handle,
        }) {
            stale.handle.abort();
        }

        info!(
            source = self.shared.source.name(),
            interval = ?self.shared.config.interval,
            max_samples = self.shared.config.max_samples,
            "sampler started"
        );
        Ok(())
    }

    /// Stops sampling and waits for the background task to exit. Safe to call
    /// when not running.
    pub async fn stop(&self) {
        let task = {
            let mut slot = self.task.lock();
            self.shared.running.store(false, Ordering::SeqCst);
            slot.take()
        };

        let Some(task) = task else {
            return;
        };

        let _ = task.stop.send(());
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                error!(error = %e, "sampling task panicked");
            }
        }
        info!(source = self.shared.source.name(), "sampler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Reads the source without touching history.
    pub async fn sample(&self) -> Result<Snapshot> {
        self.shared.source.sample().await
    }

    /// Runs one tick on the caller's task.
    pub async fn collect_once(&self) -> Result<()> {
        let snapshot = self.shared.source.sample().await?;
        self.shared.record(snapshot);
        Ok(())
    }

    pub fn metrics(&self) -> Vec<Snapshot> {
        self.shared.history.read().snapshots.to_vec()
    }

    pub fn events(&self) -> Vec<GcEvent> {
        self.shared.history.read().events.to_vec()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.shared.history.read().snapshots.latest().cloned()
    }

    pub fn metric_count(&self) -> usize {
        self.shared.history.read().snapshots.len()
    }

    pub fn event_count(&self) -> usize {
        self.shared.history.read().events.len()
    }

    pub fn clear(&self) {
        self.shared.history.write().clear();
    }

    /// A read-only view of this sampler's history that can be handed to
    /// callbacks or other tasks.
    pub fn reader(&self) -> HistoryReader {
        HistoryReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[derive(Clone)]
pub struct HistoryReader {
    shared: Arc<Shared>,
}

impl HistoryReader {
    pub fn metrics(&self) -> Vec<Snapshot> {
        self.shared.history.read().snapshots.to_vec()
    }

    pub fn events(&self) -> Vec<GcEvent> {
        self.shared.history.read().events.to_vec()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.shared.history.read().snapshots.latest().cloned()
    }
}

impl Shared {
    async fn run<F>(self: Arc<Self>, mut stop: oneshot::Receiver<()>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        // Stop and cancellation are only observed between ticks.
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = &mut shutdown => {
                    self.running.store(false, Ordering::SeqCst);
                    info!(source = self.source.name(), "sampler cancelled");
                    break;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        match self.source.sample().await {
            Ok(snapshot) => self.record(snapshot),
            Err(e) => warn!(
                source = self.source.name(),
                error = %e,
                "failed to sample GC metrics"
            ),
        }
    }

    fn record(&self, snapshot: Snapshot) {
        let (snapshot, events) = {
            let mut history = self.history.write();

            let events = match history.snapshots.latest() {
                Some(latest) if snapshot.timestamp <= latest.timestamp => {
                    warn!(
                        timestamp = %snapshot.timestamp,
                        latest = %latest.timestamp,
                        "dropping snapshot that is not newer than the last one"
                    );
                    return;
                }
                Some(latest) => reconstruct_events(latest.num_gc, &snapshot),
                None => Vec::new(),
            };

            let snapshot = if self.config.retain_pause_buffers {
                snapshot
            } else {
                snapshot.without_pauses()
            };

            history.record(snapshot.clone(), &events);
            (snapshot, events)
        };

        if !events.is_empty() {
            debug!(
                count = events.len(),
                num_gc = snapshot.num_gc,
                "reconstructed GC events"
            );
        }

        if let Some(on_event) = &self.callbacks.on_event {
            for event in &events {
                invoke("event", || on_event(event));
            }
        }
        if let Some(on_snapshot) = &self.callbacks.on_snapshot {
            invoke("snapshot", || on_snapshot(&snapshot));
        }
    }
}

fn invoke(kind: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(callback = kind, "callback panicked; history is unaffected");
    }
}

/// Samples `source` for `duration` and returns everything collected.
pub async fn collect_for_duration(
    source: Arc<dyn MetricsSource>,
    duration: Duration,
    every: Duration,
) -> Result<(Vec<Snapshot>, Vec<GcEvent>)> {
    let every = if every.is_zero() {
        DEFAULT_SAMPLING_INTERVAL
    } else {
        every
    };
    let estimated = (duration.as_nanos() / every.as_nanos()) as usize + 10;

    let sampler = Sampler::new(
        source,
        SamplerConfig {
            interval: every,
            max_samples: estimated,
            retain_pause_buffers: true,
        },
    );

    sampler.start(std::future::pending())?;
    sleep(duration).await;
    sampler.stop().await;

    Ok((sampler.metrics(), sampler.events()))
}
