use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{AsRefStr, Display, EnumString};

/// Number of entries in the runtime's circular pause buffer.
pub const PAUSE_RING_CAPACITY: usize = 256;

/// Fixed-size circular buffer of the most recent pause durations and their
/// end timestamps (nanoseconds since the Unix epoch).
///
/// Cycle `n` (1-based) lives at index `(n - 1) % PAUSE_RING_CAPACITY`, so the
/// most recent pause for a counter value `c` sits at `(c - 1) % capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPauseRing", into = "RawPauseRing")]
pub struct PauseRing {
    pause_ns: Box<[u64; PAUSE_RING_CAPACITY]>,
    pause_end_ns: Box<[u64; PAUSE_RING_CAPACITY]>,
}

impl PauseRing {
    pub fn new() -> Self {
        Self {
            pause_ns: Box::new([0; PAUSE_RING_CAPACITY]),
            pause_end_ns: Box::new([0; PAUSE_RING_CAPACITY]),
        }
    }

    pub fn index_of(cycle: u32) -> usize {
        cycle.wrapping_sub(1) as usize % PAUSE_RING_CAPACITY
    }

    pub fn record_cycle(&mut self, cycle: u32, pause_ns: u64, end_ns: u64) {
        self.set(Self::index_of(cycle), pause_ns, end_ns);
    }

    pub fn set(&mut self, index: usize, pause_ns: u64, end_ns: u64) {
        let index = index % PAUSE_RING_CAPACITY;
        self.pause_ns[index] = pause_ns;
        self.pause_end_ns[index] = end_ns;
    }

    pub fn pause_ns(&self, index: usize) -> u64 {
        self.pause_ns[index % PAUSE_RING_CAPACITY]
    }

    pub fn end_ns(&self, index: usize) -> u64 {
        self.pause_end_ns[index % PAUSE_RING_CAPACITY]
    }

    pub fn pauses(&self) -> &[u64] {
        &self.pause_ns[..]
    }
}

impl Default for PauseRing {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize)]
struct RawPauseRing {
    pause_ns: Vec<u64>,
    pause_end_ns: Vec<u64>,
}

impl TryFrom<RawPauseRing> for PauseRing {
    type Error = String;

    fn try_from(raw: RawPauseRing) -> Result<Self, Self::Error> {
        let pause_ns: Box<[u64; PAUSE_RING_CAPACITY]> = raw
            .pause_ns
            .into_boxed_slice()
            .try_into()
            .map_err(|s: Box<[u64]>| {
                format!(
                    "pause_ns must hold {} entries, got {}",
                    PAUSE_RING_CAPACITY,
                    s.len()
                )
            })?;
        let pause_end_ns: Box<[u64; PAUSE_RING_CAPACITY]> = raw
            .pause_end_ns
            .into_boxed_slice()
            .try_into()
            .map_err(|s: Box<[u64]>| {
                format!(
                    "pause_end_ns must hold {} entries, got {}",
                    PAUSE_RING_CAPACITY,
                    s.len()
                )
            })?;

        Ok(Self {
            pause_ns,
            pause_end_ns,
        })
    }
}

impl From<PauseRing> for RawPauseRing {
    fn from(ring: PauseRing) -> Self {
        Self {
            pause_ns: ring.pause_ns.to_vec(),
            pause_end_ns: ring.pause_end_ns.to_vec(),
        }
    }
}

/// One point-in-time capture of the runtime's GC and memory counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Completed collection cycles since process start.
    pub num_gc: u32,
    pub pause_total_ns: u64,
    /// `None` when the snapshot was retained in lite mode.
    pub pauses: Option<PauseRing>,
    pub last_gc: Option<DateTime<Utc>>,

    pub heap_alloc: u64,
    pub heap_peak: u64,
    pub heap_sys: u64,
    pub heap_inuse: u64,
    pub next_gc: u64,

    pub total_alloc: u64,
    pub mallocs: u64,
    pub frees: u64,

    pub gc_cpu_fraction: f64,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn without_pauses(mut self) -> Self {
        self.pauses = None;
        self
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerReason {
    HeapSize,
    Forced,
    Periodic,
    Automatic,
}

/// A discrete collection cycle rebuilt from two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcEvent {
    pub sequence: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: Duration,
    pub trigger: TriggerReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPoint {
    pub timestamp: DateTime<Utc>,
    pub heap_alloc: u64,
    pub heap_sys: u64,
    pub heap_inuse: u64,
}

pub fn datetime_from_unix_nanos(ns: u64) -> DateTime<Utc> {
    Utc.timestamp_nanos(ns.min(i64::MAX as u64) as i64)
}

pub fn unix_nanos(at: DateTime<Utc>) -> u64 {
    at.timestamp_nanos_opt().map_or(0, |ns| ns.max(0) as u64)
}
