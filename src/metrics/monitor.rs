use crate::analysis::thresholds::{ALERT_GC_CPU_FRACTION, ALERT_PAUSE_CRITICAL, ALERT_PAUSE_WARNING};
use crate::analysis::{analyze_with_events, AnalysisResult};
use crate::error::Result;
use crate::metrics::sampler::{Callbacks, Sampler, SamplerConfig};
use crate::runtime::source::MetricsSource;
use crate::runtime::types::{GcEvent, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
    Overhead,
    Pause,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    /// Sequence of the collection that raised a pause alert.
    pub sequence: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

pub fn check_snapshot(snapshot: &Snapshot) -> Option<Alert> {
    if snapshot.gc_cpu_fraction <= ALERT_GC_CPU_FRACTION {
        return None;
    }

    Some(Alert {
        kind: AlertKind::Overhead,
        severity: Severity::Warning,
        message: "High GC CPU overhead detected".to_string(),
        value: snapshot.gc_cpu_fraction * 100.0,
        threshold: ALERT_GC_CPU_FRACTION * 100.0,
        sequence: None,
        timestamp: snapshot.timestamp,
    })
}

pub fn check_event(event: &GcEvent) -> Option<Alert> {
    if event.duration <= ALERT_PAUSE_WARNING {
        return None;
    }

    let severity = if event.duration > ALERT_PAUSE_CRITICAL {
        Severity::Critical
    } else {
        Severity::Warning
    };

    Some(Alert {
        kind: AlertKind::Pause,
        severity,
        message: "Long GC pause detected".to_string(),
        value: event.duration.as_secs_f64() * 1000.0,
        threshold: ALERT_PAUSE_WARNING.as_secs_f64() * 1000.0,
        sequence: Some(event.sequence),
        timestamp: event.end,
    })
}

/// A [`Sampler`] that checks every snapshot and event against the alert
/// thresholds as they are recorded.
pub struct Monitor {
    sampler: Sampler,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        config: SamplerConfig,
        on_alert: impl Fn(&Alert) + Send + Sync + 'static,
    ) -> Self {
        Self::with_callbacks(source, config, Callbacks::default(), on_alert)
    }

    pub fn with_callbacks(
        source: Arc<dyn MetricsSource>,
        config: SamplerConfig,
        callbacks: Callbacks,
        on_alert: impl Fn(&Alert) + Send + Sync + 'static,
    ) -> Self {
        let on_alert = Arc::new(on_alert);
        let Callbacks {
            on_snapshot,
            on_event,
        } = callbacks;

        let alerting = {
            let snapshot_alert = on_alert.clone();
            let event_alert = on_alert;
            Callbacks::default()
                .on_snapshot(move |snapshot| {
                    if let Some(cb) = &on_snapshot {
                        cb(snapshot);
                    }
                    if let Some(alert) = check_snapshot(snapshot) {
                        snapshot_alert(&alert);
                    }
                })
                .on_event(move |event| {
                    if let Some(cb) = &on_event {
                        cb(event);
                    }
                    if let Some(alert) = check_event(event) {
                        event_alert(&alert);
                    }
                })
        };

        Self {
            sampler: Sampler::with_callbacks(source, config, alerting),
        }
    }

    pub fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.sampler.start(shutdown)
    }

    pub async fn stop(&self) {
        self.sampler.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.sampler.is_running()
    }

    pub fn metrics(&self) -> Vec<Snapshot> {
        self.sampler.metrics()
    }

    pub fn events(&self) -> Vec<GcEvent> {
        self.sampler.events()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.sampler.latest()
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn current_analysis(&self) -> Result<AnalysisResult> {
        analyze_with_events(&self.sampler.metrics(), &self.sampler.events())
    }
}
