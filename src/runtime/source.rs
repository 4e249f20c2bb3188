use crate::error::Result;
use crate::runtime::types::Snapshot;
use async_trait::async_trait;

/// A process-wide provider of GC counters.
///
/// `sample` must only read: two calls without intervening runtime activity
/// return snapshots that differ at most in their timestamp.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &str;

    async fn sample(&self) -> Result<Snapshot>;
}
