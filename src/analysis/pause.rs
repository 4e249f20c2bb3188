use crate::runtime::types::{GcEvent, Snapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseStats {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl PauseStats {
    pub fn from_events(events: &[GcEvent]) -> Self {
        let durations: Vec<Duration> = events.iter().map(|e| e.duration).collect();
        let total: Duration = durations.iter().sum();
        let mut stats = Self::from_sorted(sorted(durations));
        if !events.is_empty() {
            stats.avg = total / events.len() as u32;
        }
        stats
    }

    /// Pause statistics when no events were reconstructed. Percentiles come
    /// from every non-zero pause buffer entry across all snapshots, so
    /// overlapping buffers count the same pause more than once; the mean is
    /// taken from the cumulative counters instead.
    pub fn from_snapshots(snapshots: &[Snapshot]) -> Self {
        let durations = snapshots
            .iter()
            .filter_map(|s| s.pauses.as_ref())
            .flat_map(|ring| ring.pauses().iter().copied())
            .filter(|&ns| ns > 0)
            .map(Duration::from_nanos)
            .collect();

        let mut stats = Self::from_sorted(sorted(durations));
        stats.avg = Duration::ZERO;

        if let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) {
            let cycles = last.num_gc.wrapping_sub(first.num_gc);
            let paused = last.pause_total_ns.saturating_sub(first.pause_total_ns);
            if cycles > 0 && cycles <= u32::MAX / 2 {
                stats.avg = Duration::from_nanos(paused / u64::from(cycles));
            }
        }

        stats
    }

    fn from_sorted(durations: Vec<Duration>) -> Self {
        let n = durations.len();
        if n == 0 {
            return Self::default();
        }

        Self {
            min: durations[0],
            avg: Duration::ZERO,
            max: durations[n - 1],
            p95: durations[percentile_index(n, 0.95)],
            p99: durations[percentile_index(n, 0.99)],
        }
    }
}

fn sorted(mut durations: Vec<Duration>) -> Vec<Duration> {
    durations.sort_unstable();
    durations
}

/// Index of the `p` quantile in a sorted sample of `n` values:
/// `floor((n - 1) * p)` clamped to `[0, n - 1]`. Returns 0 for `n == 0`.
pub fn percentile_index(n: usize, p: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let last = n - 1;
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    ((last as f64 * p).floor() as usize).min(last)
}

/// Pause duration histogram buckets, ordered from shortest to longest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum PauseBucket {
    #[serde(rename = "0-1ms")]
    #[strum(serialize = "0-1ms")]
    UnderOneMs,
    #[serde(rename = "1-5ms")]
    #[strum(serialize = "1-5ms")]
    OneToFiveMs,
    #[serde(rename = "5-10ms")]
    #[strum(serialize = "5-10ms")]
    FiveToTenMs,
    #[serde(rename = "10-50ms")]
    #[strum(serialize = "10-50ms")]
    TenToFiftyMs,
    #[serde(rename = "50-100ms")]
    #[strum(serialize = "50-100ms")]
    FiftyToHundredMs,
    #[serde(rename = "100ms+")]
    #[strum(serialize = "100ms+")]
    HundredMsPlus,
}

impl PauseBucket {
    /// Buckets are half open: a pause of exactly 5ms lands in `5-10ms`.
    pub fn for_duration(duration: Duration) -> Self {
        match duration.as_micros() {
            0..=999 => Self::UnderOneMs,
            1_000..=4_999 => Self::OneToFiveMs,
            5_000..=9_999 => Self::FiveToTenMs,
            10_000..=49_999 => Self::TenToFiftyMs,
            50_000..=99_999 => Self::FiftyToHundredMs,
            _ => Self::HundredMsPlus,
        }
    }
}

/// Counts events per pause bucket. Every bucket is present, empty ones at zero.
pub fn pause_time_distribution(events: &[GcEvent]) -> BTreeMap<PauseBucket, usize> {
    let mut distribution: BTreeMap<PauseBucket, usize> =
        PauseBucket::iter().map(|bucket| (bucket, 0)).collect();

    for event in events {
        *distribution
            .entry(PauseBucket::for_duration(event.duration))
            .or_default() += 1;
    }

    distribution
}
