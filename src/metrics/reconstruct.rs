use crate::runtime::types::{
    datetime_from_unix_nanos, GcEvent, PauseRing, Snapshot, TriggerReason, PAUSE_RING_CAPACITY,
};
use std::time::Duration;
use tracing::warn;

/// A collection this long after the previous one is labeled periodic.
pub const PERIODIC_GC_AFTER: Duration = Duration::from_secs(120);

/// Rebuilds the cycles completed since `previous_num_gc` from `current`'s
/// pause ring.
///
/// For a counter advance of `delta`, event `i` reads ring slot
/// `(num_gc - delta + i) mod K`. When more than K cycles elapsed only the
/// newest K slots still hold their own pause, so the older cycles are lost
/// and skipped.
pub fn reconstruct_events(previous_num_gc: u32, current: &Snapshot) -> Vec<GcEvent> {
    let Some(ring) = current.pauses.as_ref() else {
        return Vec::new();
    };

    let delta = current.num_gc.wrapping_sub(previous_num_gc);
    if delta == 0 {
        return Vec::new();
    }
    if delta > u32::MAX / 2 {
        warn!(
            previous = previous_num_gc,
            current = current.num_gc,
            "cycle counter went backwards, skipping event reconstruction"
        );
        return Vec::new();
    }

    let lost = delta.saturating_sub(PAUSE_RING_CAPACITY as u32);
    if lost > 0 {
        warn!(
            lost,
            delta, "more cycles than the pause buffer holds since the last sample"
        );
    }

    let trigger = trigger_reason(current);
    let base = current.num_gc.wrapping_sub(delta);

    (lost..delta)
        .map(|i| {
            let cycle = base.wrapping_add(i);
            event_at(ring, cycle as usize % PAUSE_RING_CAPACITY, cycle.wrapping_add(1), trigger)
        })
        .collect()
}

fn event_at(ring: &PauseRing, index: usize, sequence: u32, trigger: TriggerReason) -> GcEvent {
    let duration = Duration::from_nanos(ring.pause_ns(index));
    let end = datetime_from_unix_nanos(ring.end_ns(index));
    let start = end - chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());

    GcEvent {
        sequence,
        start,
        end,
        duration,
        trigger,
    }
}

/// Best-effort label for why the runtime collected. Runtimes do not expose
/// the real trigger, so this only reflects the counters at sample time.
pub fn trigger_reason(snapshot: &Snapshot) -> TriggerReason {
    if snapshot.next_gc < snapshot.heap_alloc / 2 {
        return TriggerReason::Forced;
    }

    if snapshot.heap_alloc >= snapshot.next_gc {
        return TriggerReason::HeapSize;
    }

    if let Some(last_gc) = snapshot.last_gc {
        let since = (snapshot.timestamp - last_gc).to_std().unwrap_or_default();
        if since > PERIODIC_GC_AFTER {
            return TriggerReason::Periodic;
        }
    }

    TriggerReason::Automatic
}
