pub mod history;
pub mod monitor;
pub mod reconstruct;
pub mod sampler;

pub use monitor::{Alert, AlertKind, Monitor, Severity};
pub use sampler::{collect_for_duration, Callbacks, HistoryReader, Sampler, SamplerConfig};
