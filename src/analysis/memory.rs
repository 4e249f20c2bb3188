use crate::runtime::types::{GcEvent, MemoryPoint, Snapshot};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct HeapStats {
    pub avg: u64,
    pub min: u64,
    pub max: u64,
    pub avg_sys: u64,
}

impl HeapStats {
    pub(crate) fn from_snapshots(snapshots: &[Snapshot]) -> Self {
        if snapshots.is_empty() {
            return Self::default();
        }

        let n = snapshots.len() as u128;
        let total: u128 = snapshots.iter().map(|s| u128::from(s.heap_alloc)).sum();
        let total_sys: u128 = snapshots.iter().map(|s| u128::from(s.heap_sys)).sum();

        Self {
            avg: (total / n) as u64,
            min: snapshots.iter().map(|s| s.heap_alloc).min().unwrap_or(0),
            max: snapshots.iter().map(|s| s.heap_alloc).max().unwrap_or(0),
            avg_sys: (total_sys / n) as u64,
        }
    }
}

/// Heap occupancy over time, one point per snapshot.
pub fn memory_trend(snapshots: &[Snapshot]) -> Vec<MemoryPoint> {
    snapshots
        .iter()
        .map(|s| MemoryPoint {
            timestamp: s.timestamp,
            heap_alloc: s.heap_alloc,
            heap_sys: s.heap_sys,
            heap_inuse: s.heap_inuse,
        })
        .collect()
}

/// Mean relative heap change between consecutive samples of the last
/// `window` snapshots. Pairs starting from an empty heap are skipped.
pub fn recent_growth_trend(snapshots: &[Snapshot], window: usize) -> f64 {
    if window < 2 || snapshots.len() < window {
        return 0.0;
    }

    let recent = &snapshots[snapshots.len() - window..];
    let growths: Vec<f64> = recent
        .windows(2)
        .filter(|pair| pair[0].heap_alloc > 0)
        .map(|pair| {
            let prev = pair[0].heap_alloc as f64;
            (pair[1].heap_alloc as f64 - prev) / prev
        })
        .collect();

    if growths.is_empty() {
        0.0
    } else {
        growths.iter().sum::<f64>() / growths.len() as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub metric_count: usize,
    pub event_count: usize,
    pub period_seconds: f64,
    pub gc_count: u32,
}

/// Size and span of a captured window.
pub fn window_stats(snapshots: &[Snapshot], events: &[GcEvent]) -> WindowStats {
    let (period_seconds, gc_count) = match (snapshots.first(), snapshots.last()) {
        (Some(first), Some(last)) => (
            (last.timestamp - first.timestamp)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            cycles_between(first, last),
        ),
        _ => (0.0, 0),
    };

    WindowStats {
        metric_count: snapshots.len(),
        event_count: events.len(),
        period_seconds,
        gc_count,
    }
}

/// Cycles completed between two snapshots, zero when the counter went
/// backwards.
pub(crate) fn cycles_between(first: &Snapshot, last: &Snapshot) -> u32 {
    let delta = last.num_gc.wrapping_sub(first.num_gc);
    if delta > u32::MAX / 2 {
        0
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_710_000_000 + secs, 0).unwrap()
    }

    fn snapshot(secs: i64, num_gc: u32, heap_alloc: u64) -> Snapshot {
        Snapshot {
            num_gc,
            pause_total_ns: 0,
            pauses: None,
            last_gc: None,
            heap_alloc,
            heap_peak: heap_alloc,
            heap_sys: heap_alloc * 2,
            heap_inuse: heap_alloc,
            next_gc: 0,
            total_alloc: 0,
            mallocs: 0,
            frees: 0,
            gc_cpu_fraction: 0.0,
            timestamp: at(secs),
        }
    }

    #[test]
    fn test_memory_trend_mirrors_snapshots() {
        let snapshots = vec![snapshot(0, 0, 100), snapshot(1, 1, 300)];
        let trend = memory_trend(&snapshots);

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[1].timestamp, at(1));
        assert_eq!(trend[1].heap_alloc, 300);
        assert_eq!(trend[1].heap_sys, 600);
        assert!(memory_trend(&[]).is_empty());
    }

    #[test]
    fn test_heap_stats() {
        let snapshots = vec![snapshot(0, 0, 100), snapshot(1, 0, 400), snapshot(2, 0, 100)];
        let stats = HeapStats::from_snapshots(&snapshots);
        assert_eq!(stats.avg, 200);
        assert_eq!(stats.min, 100);
        assert_eq!(stats.max, 400);
        assert_eq!(stats.avg_sys, 400);
    }

    #[test]
    fn test_growth_trend_over_window() {
        // Heap doubles every sample: mean relative growth of 1.0.
        let doubling: Vec<Snapshot> = (0..12)
            .map(|i| snapshot(i, 0, 1024 << i))
            .collect();
        assert!((recent_growth_trend(&doubling, 10) - 1.0).abs() < 1e-12);

        let flat: Vec<Snapshot> = (0..12).map(|i| snapshot(i, 0, 4096)).collect();
        assert_eq!(recent_growth_trend(&flat, 10), 0.0);

        assert_eq!(recent_growth_trend(&doubling[..5], 10), 0.0);
    }

    #[test]
    fn test_growth_trend_skips_empty_heap() {
        let mut snapshots: Vec<Snapshot> = (0..10).map(|i| snapshot(i, 0, 0)).collect();
        snapshots[9].heap_alloc = 1_000;
        assert_eq!(recent_growth_trend(&snapshots, 10), 0.0);
    }

    #[test]
    fn test_window_stats() {
        let snapshots = vec![snapshot(0, 3, 100), snapshot(4, 11, 100)];
        let stats = window_stats(&snapshots, &[]);

        assert_eq!(
            stats,
            WindowStats {
                metric_count: 2,
                event_count: 0,
                period_seconds: 4.0,
                gc_count: 8,
            }
        );
        assert_eq!(window_stats(&[], &[]), WindowStats::default());
    }
}
