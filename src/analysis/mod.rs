//! Statistics, distributions and tuning advice over a captured window of
//! snapshots and reconstructed events.
//!
//! Everything here is a pure function of its inputs. Degraded inputs (zero
//! period, counters that went backwards, missing pause buffers) produce
//! zeroed fields rather than errors.

pub mod memory;
pub mod pause;
pub mod recommendations;
pub mod thresholds;

pub use memory::{memory_trend, window_stats, WindowStats};
pub use pause::{pause_time_distribution, percentile_index, PauseBucket, PauseStats};
pub use recommendations::Advisory;

use crate::error::{AppError, Result};
use crate::runtime::types::{GcEvent, Snapshot};
use chrono::{DateTime, Utc};
use memory::{cycles_between, HeapStats};
use serde::{Serialize, Serializer};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    #[serde(serialize_with = "as_millis")]
    pub period: Duration,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Collections per second.
    pub gc_frequency: f64,
    #[serde(serialize_with = "as_millis")]
    pub avg_gc_interval: Duration,

    #[serde(serialize_with = "as_millis")]
    pub min_pause_time: Duration,
    #[serde(serialize_with = "as_millis")]
    pub avg_pause_time: Duration,
    #[serde(serialize_with = "as_millis")]
    pub max_pause_time: Duration,
    #[serde(serialize_with = "as_millis")]
    pub p95_pause_time: Duration,
    #[serde(serialize_with = "as_millis")]
    pub p99_pause_time: Duration,

    pub avg_heap_size: u64,
    pub min_heap_size: u64,
    pub max_heap_size: u64,
    /// Bytes per second; negative when the heap shrank.
    pub heap_growth_rate: f64,

    /// Bytes per second.
    pub alloc_rate: f64,
    pub alloc_count: u64,
    pub free_count: u64,

    /// Percent of CPU time spent collecting.
    pub gc_overhead: f64,
    /// Percent of the heap obtained from the system that is allocated.
    pub memory_efficiency: f64,

    pub recommendations: Vec<String>,
}

fn as_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Analyzes snapshots alone. Pause statistics fall back to the pause buffers.
pub fn analyze(snapshots: &[Snapshot]) -> Result<AnalysisResult> {
    analyze_with_events(snapshots, &[])
}

pub fn analyze_with_events(snapshots: &[Snapshot], events: &[GcEvent]) -> Result<AnalysisResult> {
    let (first, last) = match snapshots {
        [first, .., last] => (first, last),
        _ => return Err(AppError::InsufficientData(snapshots.len())),
    };

    let period = (last.timestamp - first.timestamp)
        .to_std()
        .unwrap_or_default();
    let seconds = period.as_secs_f64();
    let per_second = |value: f64| if seconds > 0.0 { value / seconds } else { 0.0 };

    let cycles = cycles_between(first, last);
    let avg_gc_interval = if cycles > 0 {
        period / cycles
    } else {
        Duration::ZERO
    };

    let pauses = if events.is_empty() {
        PauseStats::from_snapshots(snapshots)
    } else {
        PauseStats::from_events(events)
    };

    let heap = HeapStats::from_snapshots(snapshots);
    let heap_delta = last.heap_alloc as f64 - first.heap_alloc as f64;

    let fractions: Vec<f64> = snapshots
        .iter()
        .map(|s| s.gc_cpu_fraction)
        .filter(|f| *f >= 0.0)
        .collect();
    let gc_overhead = if fractions.is_empty() {
        0.0
    } else {
        fractions.iter().sum::<f64>() / fractions.len() as f64 * 100.0
    };

    let memory_efficiency = if heap.avg > 0 && heap.avg_sys > 0 {
        heap.avg as f64 / heap.avg_sys as f64 * 100.0
    } else {
        0.0
    };

    let mut analysis = AnalysisResult {
        period,
        start_time: first.timestamp,
        end_time: last.timestamp,
        gc_frequency: per_second(f64::from(cycles)),
        avg_gc_interval,
        min_pause_time: pauses.min,
        avg_pause_time: pauses.avg,
        max_pause_time: pauses.max,
        p95_pause_time: pauses.p95,
        p99_pause_time: pauses.p99,
        avg_heap_size: heap.avg,
        min_heap_size: heap.min,
        max_heap_size: heap.max,
        heap_growth_rate: per_second(heap_delta),
        alloc_rate: per_second(last.total_alloc.saturating_sub(first.total_alloc) as f64),
        alloc_count: last.mallocs.saturating_sub(first.mallocs),
        free_count: last.frees.saturating_sub(first.frees),
        gc_overhead,
        memory_efficiency,
        recommendations: Vec::new(),
    };

    analysis.recommendations = recommendations::advisories(&analysis, snapshots)
        .iter()
        .map(|advisory| advisory.message().to_string())
        .collect();

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::{PauseRing, TriggerReason};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const MIB: u64 = 1024 * 1024;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_715_000_000_000 + millis).unwrap()
    }

    fn snapshot(millis: i64, num_gc: u32, heap_alloc: u64) -> Snapshot {
        Snapshot {
            num_gc,
            pause_total_ns: 0,
            pauses: Some(PauseRing::new()),
            last_gc: None,
            heap_alloc,
            heap_peak: heap_alloc,
            heap_sys: 64 * MIB,
            heap_inuse: heap_alloc,
            next_gc: 2 * heap_alloc,
            total_alloc: 0,
            mallocs: 0,
            frees: 0,
            gc_cpu_fraction: 0.01,
            timestamp: at(millis),
        }
    }

    fn event(sequence: u32, millis: u64) -> GcEvent {
        GcEvent {
            sequence,
            start: at(0),
            end: at(0),
            duration: Duration::from_millis(millis),
            trigger: TriggerReason::Automatic,
        }
    }

    #[test]
    fn test_fewer_than_two_snapshots_is_insufficient() {
        assert!(matches!(analyze(&[]), Err(AppError::InsufficientData(0))));
        assert!(matches!(
            analyze(&[snapshot(0, 0, MIB)]),
            Err(AppError::InsufficientData(1))
        ));
    }

    #[test]
    fn test_frequency_and_interval() {
        let snapshots = vec![snapshot(0, 10, 32 * MIB), snapshot(4_000, 30, 32 * MIB)];
        let analysis = analyze(&snapshots).unwrap();

        assert_eq!(analysis.period, Duration::from_secs(4));
        assert!((analysis.gc_frequency - 5.0).abs() < 1e-9);
        assert_eq!(analysis.avg_gc_interval, Duration::from_millis(200));
        assert_eq!(analysis.start_time, at(0));
        assert_eq!(analysis.end_time, at(4_000));
    }

    #[test]
    fn test_zero_period_degrades_to_zero_rates() {
        let snapshots = vec![snapshot(0, 1, MIB), snapshot(0, 5, 2 * MIB)];
        let analysis = analyze(&snapshots).unwrap();

        assert_eq!(analysis.gc_frequency, 0.0);
        assert_eq!(analysis.heap_growth_rate, 0.0);
        assert_eq!(analysis.alloc_rate, 0.0);
        assert_eq!(analysis.avg_gc_interval, Duration::ZERO);
    }

    #[test]
    fn test_decreasing_heap_gives_negative_growth() {
        let snapshots = vec![snapshot(0, 0, 40 * MIB), snapshot(2_000, 3, 20 * MIB)];
        let analysis = analyze(&snapshots).unwrap();
        assert!((analysis.heap_growth_rate + 10.0 * MIB as f64).abs() < 1e-6);
    }

    #[test]
    fn test_pause_statistics_prefer_events() {
        let mut first = snapshot(0, 0, MIB);
        let mut last = snapshot(1_000, 3, MIB);
        first.pause_total_ns = 0;
        last.pause_total_ns = 900_000_000;

        let events = vec![event(1, 2), event(2, 4), event(3, 9)];
        let analysis = analyze_with_events(&[first.clone(), last.clone()], &events).unwrap();
        assert_eq!(analysis.min_pause_time, Duration::from_millis(2));
        assert_eq!(analysis.avg_pause_time, Duration::from_millis(5));
        assert_eq!(analysis.max_pause_time, Duration::from_millis(9));
        assert_eq!(analysis.p99_pause_time, Duration::from_millis(4));

        // Without events the mean comes from the cumulative pause counter.
        let fallback = analyze(&[first, last]).unwrap();
        assert_eq!(fallback.avg_pause_time, Duration::from_millis(300));
        assert_eq!(fallback.max_pause_time, Duration::ZERO);
    }

    #[test]
    fn test_allocation_and_efficiency() {
        let mut first = snapshot(0, 0, 16 * MIB);
        let mut last = snapshot(2_000, 0, 48 * MIB);
        first.total_alloc = 0;
        last.total_alloc = 8 * MIB;
        first.mallocs = 100;
        last.mallocs = 350;
        last.frees = 40;
        first.gc_cpu_fraction = 0.1;
        last.gc_cpu_fraction = -1.0;

        let analysis = analyze(&[first, last]).unwrap();
        assert!((analysis.alloc_rate - 4.0 * MIB as f64).abs() < 1e-6);
        assert_eq!(analysis.alloc_count, 250);
        assert_eq!(analysis.free_count, 40);
        assert!((analysis.gc_overhead - 10.0).abs() < 1e-9);
        // avg heap 32 MiB of 64 MiB obtained
        assert!((analysis.memory_efficiency - 50.0).abs() < 1e-9);
        assert_eq!(analysis.avg_heap_size, 32 * MIB);
        assert_eq!(analysis.min_heap_size, 16 * MIB);
        assert_eq!(analysis.max_heap_size, 48 * MIB);
    }

    #[test]
    fn test_leak_advice_runs_last() {
        let snapshots: Vec<Snapshot> = (0..10)
            .map(|i| {
                let mut s = snapshot(i * 1_000, 0, (MIB as f64 * 1.5f64.powi(i as i32)) as u64);
                s.heap_sys = 4096 * MIB;
                s
            })
            .collect();

        let analysis = analyze(&snapshots).unwrap();
        assert_eq!(
            analysis.recommendations.last().map(String::as_str),
            Some(Advisory::SuspectedLeak.message())
        );
        assert!(analysis
            .recommendations
            .contains(&Advisory::LowMemoryEfficiency.message().to_string()));
    }

    #[test]
    fn test_serializes_durations_as_millis() {
        let snapshots = vec![snapshot(0, 0, MIB), snapshot(1_500, 0, MIB)];
        let json = serde_json::to_value(analyze(&snapshots).unwrap()).unwrap();
        assert_eq!(json["period"], serde_json::json!(1500.0));
    }

    proptest! {
        #[test]
        fn frequency_is_cycles_over_seconds(cycles in 0u32..100_000, millis in 1i64..3_600_000) {
            let snapshots = vec![snapshot(0, 7, MIB), snapshot(millis, 7 + cycles, MIB)];
            let analysis = analyze(&snapshots).unwrap();
            let expected = f64::from(cycles) / (millis as f64 / 1000.0);
            prop_assert!((analysis.gc_frequency - expected).abs() <= expected * 1e-9 + 1e-9);
        }
    }
}
