use crate::error::Result;
use crate::runtime::jdk_tools::detector::JdkTools;
use crate::runtime::jdk_tools::executor::run_tool;
use crate::runtime::jdk_tools::parser::{parse_gc, JstatGc};
use crate::runtime::jdk_tools::JdkToolsError;
use crate::runtime::source::MetricsSource;
use crate::runtime::types::{unix_nanos, PauseRing, Snapshot, PAUSE_RING_CAPACITY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;

/// Samples a running JVM through `jstat -gc -t <pid>`.
///
/// jstat only reports cumulative counts and time, so the per-cycle pause
/// ring is synthesized here: every cycle observed between two calls gets the
/// mean pause of that interval.
pub struct JstatSource {
    pid: u32,
    jstat: PathBuf,
    name: String,
    tracker: Mutex<GcTracker>,
}

impl JstatSource {
    pub fn new(pid: u32) -> Result<Self> {
        let jstat = JdkTools::detect().jstat_path()?;
        Ok(Self::with_jstat(pid, jstat))
    }

    pub fn with_jstat(pid: u32, jstat: PathBuf) -> Self {
        Self {
            pid,
            jstat,
            name: format!("jvm:{}", pid),
            tracker: Mutex::new(GcTracker::default()),
        }
    }
}

#[async_trait]
impl MetricsSource for JstatSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&self) -> Result<Snapshot> {
        let pid = self.pid.to_string();
        let output = run_tool(&self.jstat, &["-gc", "-t", pid.as_str()], None).await?;
        let gc = parse_gc(&output).map_err(JdkToolsError::ParseError)?;
        Ok(self.tracker.lock().observe(gc, Utc::now()))
    }
}

#[derive(Default)]
struct GcTracker {
    previous: Option<JstatGc>,
    num_gc: u32,
    pause_total_ns: u64,
    pauses: PauseRing,
    last_gc: Option<DateTime<Utc>>,
    total_alloc: u64,
    heap_peak: u64,
}

impl GcTracker {
    fn observe(&mut self, gc: JstatGc, now: DateTime<Utc>) -> Snapshot {
        let heap_used = gc.heap_used_bytes();

        match self.previous.take() {
            // A lower cycle count means the pid now belongs to a new JVM.
            Some(prev) if gc.cycles() >= prev.cycles() => {
                self.record_cycles(&prev, &gc, now);
                self.total_alloc += allocated_between(&prev, &gc);
            }
            _ => {
                self.num_gc = gc.cycles() as u32;
                self.pause_total_ns = gc.total_gc_time.as_nanos() as u64;
                self.pauses = PauseRing::new();
                self.total_alloc = heap_used;
                self.heap_peak = 0;
            }
        }

        self.heap_peak = self.heap_peak.max(heap_used);

        let gc_cpu_fraction = if gc.uptime.is_zero() {
            0.0
        } else {
            (gc.total_gc_time.as_secs_f64() / gc.uptime.as_secs_f64()).min(1.0)
        };

        let snapshot = Snapshot {
            num_gc: self.num_gc,
            pause_total_ns: self.pause_total_ns,
            pauses: Some(self.pauses.clone()),
            last_gc: self.last_gc,
            heap_alloc: heap_used,
            heap_peak: self.heap_peak,
            heap_sys: gc.heap_capacity_bytes(),
            heap_inuse: heap_used,
            // The next young collection starts once eden is full.
            next_gc: heap_used - gc.eden_used_bytes().min(heap_used) + gc.eden_capacity_bytes(),
            total_alloc: self.total_alloc,
            mallocs: 0,
            frees: 0,
            gc_cpu_fraction,
            timestamp: now,
        };

        self.previous = Some(gc);
        snapshot
    }

    fn record_cycles(&mut self, prev: &JstatGc, gc: &JstatGc, now: DateTime<Utc>) {
        let delta = gc.cycles() - prev.cycles();
        let elapsed = gc.total_gc_time.saturating_sub(prev.total_gc_time);
        let elapsed_ns = elapsed.as_nanos() as u64;
        self.pause_total_ns += elapsed_ns;

        if delta == 0 {
            return;
        }

        let per_cycle = elapsed_ns / delta;
        let end_ns = unix_nanos(now);
        let recoverable = delta.min(PAUSE_RING_CAPACITY as u64);
        let first_cycle = self.num_gc.wrapping_add((delta - recoverable) as u32);

        for k in 1..=recoverable {
            let cycle = first_cycle.wrapping_add(k as u32);
            let end = end_ns.saturating_sub((recoverable - k) * per_cycle);
            self.pauses.record_cycle(cycle, per_cycle, end);
        }

        self.num_gc = self.num_gc.wrapping_add(delta as u32);
        self.last_gc = Some(now);
    }
}

/// Estimates bytes allocated between two rows from eden occupancy. A young
/// collection in between means eden filled up and was emptied.
fn allocated_between(prev: &JstatGc, gc: &JstatGc) -> u64 {
    let prev_eden = prev.eden_used_bytes();
    let eden = gc.eden_used_bytes();

    if gc.young_gc_count > prev.young_gc_count {
        prev.eden_capacity_bytes().saturating_sub(prev_eden) + eden
    } else {
        eden.saturating_sub(prev_eden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn row(young: u64, gct_ms: u64, eden_used_kb: f64) -> JstatGc {
        JstatGc {
            uptime: Duration::from_secs(100),
            survivor_capacity_kb: 1024.0,
            survivor_used_kb: 512.0,
            eden_capacity_kb: 8192.0,
            eden_used_kb,
            old_capacity_kb: 16384.0,
            old_used_kb: 4096.0,
            young_gc_count: young,
            full_gc_count: 0,
            concurrent_gc_count: 0,
            total_gc_time: Duration::from_millis(gct_ms),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_first_observation_sets_baseline() {
        let mut tracker = GcTracker::default();
        let snap = tracker.observe(row(10, 200, 1024.0), at(0));

        assert_eq!(snap.num_gc, 10);
        assert_eq!(snap.pause_total_ns, 200_000_000);
        assert!(snap.pauses.unwrap().pauses().iter().all(|&p| p == 0));
        assert!((snap.gc_cpu_fraction - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_new_cycles_fill_pause_ring_with_mean() {
        let mut tracker = GcTracker::default();
        tracker.observe(row(10, 200, 1024.0), at(0));
        let snap = tracker.observe(row(13, 230, 2048.0), at(1));

        let ring = snap.pauses.unwrap();
        assert_eq!(snap.num_gc, 13);
        for cycle in 11..=13 {
            assert_eq!(ring.pause_ns(PauseRing::index_of(cycle)), 10_000_000);
        }
        assert_eq!(ring.end_ns(PauseRing::index_of(13)), unix_nanos(at(1)));
        assert_eq!(snap.last_gc, Some(at(1)));
        assert_eq!(snap.pause_total_ns, 230_000_000);
    }

    #[test]
    fn test_allocation_estimate_across_young_gc() {
        let mut tracker = GcTracker::default();
        let first = tracker.observe(row(10, 200, 6144.0), at(0));
        let second = tracker.observe(row(11, 210, 1024.0), at(1));

        // 2 MiB left in eden before the collection plus 1 MiB since.
        assert_eq!(second.total_alloc - first.total_alloc, 3 * 1024 * 1024);
    }

    #[test]
    fn test_counter_reset_starts_over() {
        let mut tracker = GcTracker::default();
        tracker.observe(row(50, 900, 1024.0), at(0));
        let snap = tracker.observe(row(2, 10, 1024.0), at(1));
        assert_eq!(snap.num_gc, 2);
        assert_eq!(snap.pause_total_ns, 10_000_000);
    }
}
