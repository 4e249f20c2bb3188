use crate::error::Result;
use crate::runtime::source::MetricsSource;
use crate::runtime::types::{unix_nanos, PauseRing, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

const MIN_HEAP_TARGET: u64 = 4 * 1024 * 1024;
const HEAP_ARENA: u64 = 1024 * 1024;
const DEFAULT_GROWTH_PERCENT: u64 = 100;

enum Clock {
    Wall,
    Manual(DateTime<Utc>),
}

struct HeapModel {
    clock: Clock,
    started_at: DateTime<Utc>,

    num_gc: u32,
    pause_total_ns: u64,
    pauses: PauseRing,
    last_gc: Option<DateTime<Utc>>,

    heap_alloc: u64,
    heap_peak: u64,
    heap_sys: u64,
    next_gc: u64,
    growth_percent: u64,

    garbage_bytes: u64,
    garbage_objects: u64,
    total_alloc: u64,
    mallocs: u64,
    frees: u64,

    cpu_fraction_override: Option<f64>,
}

impl HeapModel {
    fn now(&self) -> DateTime<Utc> {
        match self.clock {
            Clock::Wall => Utc::now(),
            Clock::Manual(at) => at,
        }
    }

    fn grow_arena(&mut self) {
        if self.heap_alloc > self.heap_sys {
            let arenas = self.heap_alloc.div_ceil(HEAP_ARENA);
            self.heap_sys = arenas * HEAP_ARENA;
        }
    }

    fn cpu_fraction(&self, now: DateTime<Utc>) -> f64 {
        if let Some(fraction) = self.cpu_fraction_override {
            return fraction;
        }
        let elapsed_ns = (now - self.started_at).num_nanoseconds().unwrap_or(0);
        if elapsed_ns <= 0 {
            return 0.0;
        }
        (self.pause_total_ns as f64 / elapsed_ns as f64).min(1.0)
    }
}

/// In-process model of a managed heap with a pacing collector.
///
/// Collections are recorded into a circular pause buffer exactly the way a
/// real runtime exposes them, which makes this the synthetic source for tests
/// and for `--simulate` runs.
pub struct SimulatedRuntime {
    state: Mutex<HeapModel>,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::with_clock(Clock::Wall)
    }

    /// Uses a clock that only moves through [`SimulatedRuntime::advance`].
    pub fn with_manual_clock(start: DateTime<Utc>) -> Self {
        Self::with_clock(Clock::Manual(start))
    }

    fn with_clock(clock: Clock) -> Self {
        let started_at = match clock {
            Clock::Wall => Utc::now(),
            Clock::Manual(at) => at,
        };

        Self {
            state: Mutex::new(HeapModel {
                clock,
                started_at,
                num_gc: 0,
                pause_total_ns: 0,
                pauses: PauseRing::new(),
                last_gc: None,
                heap_alloc: 0,
                heap_peak: 0,
                heap_sys: MIN_HEAP_TARGET,
                next_gc: MIN_HEAP_TARGET,
                growth_percent: DEFAULT_GROWTH_PERCENT,
                garbage_bytes: 0,
                garbage_objects: 0,
                total_alloc: 0,
                mallocs: 0,
                frees: 0,
                cpu_fraction_override: None,
            }),
        }
    }

    pub fn set_growth_percent(&self, percent: u64) {
        self.state.lock().growth_percent = percent;
    }

    pub fn set_gc_cpu_fraction(&self, fraction: f64) {
        self.state.lock().cpu_fraction_override = Some(fraction);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.state.lock().now()
    }

    /// Moves a manual clock forward. Has no effect on the wall clock.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        if let Clock::Manual(at) = state.clock {
            let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
            state.clock = Clock::Manual(at + by);
        }
    }

    pub fn allocate(&self, bytes: u64, objects: u64) {
        let mut state = self.state.lock();
        state.heap_alloc += bytes;
        state.total_alloc += bytes;
        state.mallocs += objects;
        state.heap_peak = state.heap_peak.max(state.heap_alloc);
        state.grow_arena();
    }

    /// Marks memory unreachable; it is reclaimed by the next collection.
    pub fn drop_references(&self, bytes: u64, objects: u64) {
        let mut state = self.state.lock();
        let reclaimable = state.heap_alloc - state.garbage_bytes;
        state.garbage_bytes += bytes.min(reclaimable);
        state.garbage_objects += objects;
    }

    pub fn should_collect(&self) -> bool {
        let state = self.state.lock();
        state.heap_alloc >= state.next_gc
    }

    /// Runs one collection cycle ending at the current clock.
    pub fn collect(&self, pause: Duration) {
        let mut state = self.state.lock();
        let end = state.now();
        let pause_ns = pause.as_nanos().min(u64::MAX as u128) as u64;

        state.num_gc = state.num_gc.wrapping_add(1);
        let cycle = state.num_gc;
        state.pauses.record_cycle(cycle, pause_ns, unix_nanos(end));
        state.pause_total_ns += pause_ns;
        state.last_gc = Some(end);

        state.heap_alloc -= state.garbage_bytes;
        state.frees += state.garbage_objects;
        state.garbage_bytes = 0;
        state.garbage_objects = 0;

        let target = state.heap_alloc + state.heap_alloc * state.growth_percent / 100;
        state.next_gc = target.max(MIN_HEAP_TARGET);
    }

    fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        let now = state.now();
        Snapshot {
            num_gc: state.num_gc,
            pause_total_ns: state.pause_total_ns,
            pauses: Some(state.pauses.clone()),
            last_gc: state.last_gc,
            heap_alloc: state.heap_alloc,
            heap_peak: state.heap_peak,
            heap_sys: state.heap_sys,
            heap_inuse: state.heap_alloc.div_ceil(HEAP_ARENA) * HEAP_ARENA,
            next_gc: state.next_gc,
            total_alloc: state.total_alloc,
            mallocs: state.mallocs,
            frees: state.frees,
            gc_cpu_fraction: state.cpu_fraction(now),
            timestamp: now,
        }
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SimulatedRuntime {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn sample(&self) -> Result<Snapshot> {
        Ok(self.snapshot())
    }
}

/// Steady allocation pressure applied to a [`SimulatedRuntime`].
#[derive(Debug, Clone)]
pub struct Workload {
    pub tick: Duration,
    pub bytes_per_tick: u64,
    pub objects_per_tick: u64,
    /// Share of each tick's allocation that stays reachable.
    pub survival_percent: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            bytes_per_tick: 512 * 1024,
            objects_per_tick: 2_000,
            survival_percent: 2,
        }
    }
}

impl Workload {
    pub fn step(&self, runtime: &SimulatedRuntime) {
        runtime.allocate(self.bytes_per_tick, self.objects_per_tick);

        let garbage = 100u64.saturating_sub(self.survival_percent);
        runtime.drop_references(
            self.bytes_per_tick * garbage / 100,
            self.objects_per_tick * garbage / 100,
        );

        if runtime.should_collect() {
            runtime.collect(pause_for(runtime));
        }
    }

    pub async fn run(self, runtime: Arc<SimulatedRuntime>) {
        let mut ticker = interval(self.tick);
        loop {
            ticker.tick().await;
            self.step(&runtime);
        }
    }
}

fn pause_for(runtime: &SimulatedRuntime) -> Duration {
    let state = runtime.state.lock();
    let live_mib = (state.heap_alloc - state.garbage_bytes) / (1024 * 1024);
    let jitter = u64::from(state.num_gc % 7) * 30;
    Duration::from_micros(50 + live_mib * 20 + jitter)
}
