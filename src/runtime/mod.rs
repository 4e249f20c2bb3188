pub mod jdk_tools;
pub mod simulated;
pub mod source;
pub mod types;

pub use simulated::{SimulatedRuntime, Workload};
pub use source::MetricsSource;
pub use types::{GcEvent, MemoryPoint, PauseRing, Snapshot, TriggerReason, PAUSE_RING_CAPACITY};
