use crate::analysis::memory::recent_growth_trend;
use crate::analysis::thresholds::*;
use crate::analysis::AnalysisResult;
use crate::runtime::types::Snapshot;
use serde::Serialize;
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Advisory {
    HighGcFrequency,
    LongAveragePause,
    LongTailPause,
    HighHeapGrowth,
    HighGcOverhead,
    LowMemoryEfficiency,
    HighAllocationRate,
    SuspectedLeak,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Self::HighGcFrequency => {
                "High GC frequency detected. Consider reducing the allocation rate or letting the heap grow further between collections."
            }
            Self::LongAveragePause => {
                "Long GC pause times detected. Consider reducing heap size or optimizing allocation patterns."
            }
            Self::LongTailPause => {
                "Very long P99 pause times detected. This may impact application responsiveness."
            }
            Self::HighHeapGrowth => {
                "High heap growth rate detected. Check for memory leaks or excessive allocations."
            }
            Self::HighGcOverhead => {
                "High GC overhead detected. Consider optimizing allocation patterns or tuning collector parameters."
            }
            Self::LowMemoryEfficiency => {
                "Low memory efficiency detected. Consider reducing heap fragmentation or optimizing data structures."
            }
            Self::HighAllocationRate => {
                "High allocation rate detected. Consider object pooling or reducing temporary object creation."
            }
            Self::SuspectedLeak => {
                "Consistent memory growth detected. Investigate potential memory leaks."
            }
        }
    }
}

/// Threshold checks in a fixed order, followed by the trailing-window leak
/// check when enough snapshots are available.
pub fn advisories(analysis: &AnalysisResult, snapshots: &[Snapshot]) -> Vec<Advisory> {
    let checks = [
        (
            analysis.gc_frequency > MAX_GC_FREQUENCY,
            Advisory::HighGcFrequency,
        ),
        (
            analysis.avg_pause_time > MAX_AVG_PAUSE,
            Advisory::LongAveragePause,
        ),
        (
            analysis.p99_pause_time > MAX_P99_PAUSE,
            Advisory::LongTailPause,
        ),
        (
            analysis.heap_growth_rate > MAX_HEAP_GROWTH_RATE,
            Advisory::HighHeapGrowth,
        ),
        (
            analysis.gc_overhead > MAX_GC_OVERHEAD,
            Advisory::HighGcOverhead,
        ),
        (
            analysis.memory_efficiency > 0.0 && analysis.memory_efficiency < MIN_MEMORY_EFFICIENCY,
            Advisory::LowMemoryEfficiency,
        ),
        (
            analysis.alloc_rate > MAX_ALLOC_RATE,
            Advisory::HighAllocationRate,
        ),
    ];

    let mut advisories: Vec<Advisory> = checks
        .into_iter()
        .filter_map(|(triggered, advisory)| triggered.then_some(advisory))
        .collect();

    if snapshots.len() >= TREND_WINDOW
        && recent_growth_trend(snapshots, TREND_WINDOW) > MAX_TREND_GROWTH
    {
        advisories.push(Advisory::SuspectedLeak);
    }

    advisories
}
