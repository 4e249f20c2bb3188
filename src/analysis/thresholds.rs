use std::time::Duration;

const MIB: f64 = 1024.0 * 1024.0;

/// Collections per second.
pub const MAX_GC_FREQUENCY: f64 = 10.0;
pub const MAX_AVG_PAUSE: Duration = Duration::from_millis(100);
pub const MAX_P99_PAUSE: Duration = Duration::from_millis(500);
/// Bytes per second.
pub const MAX_HEAP_GROWTH_RATE: f64 = 10.0 * MIB;
/// Percent of CPU time.
pub const MAX_GC_OVERHEAD: f64 = 25.0;
/// Percent of system heap in use.
pub const MIN_MEMORY_EFFICIENCY: f64 = 50.0;
/// Bytes per second.
pub const MAX_ALLOC_RATE: f64 = 100.0 * MIB;

pub const TREND_WINDOW: usize = 10;
/// Mean relative heap growth between consecutive samples of the trailing
/// window.
pub const MAX_TREND_GROWTH: f64 = 0.1;

pub const ALERT_GC_CPU_FRACTION: f64 = 0.25;
pub const ALERT_PAUSE_WARNING: Duration = Duration::from_millis(100);
pub const ALERT_PAUSE_CRITICAL: Duration = Duration::from_millis(500);
