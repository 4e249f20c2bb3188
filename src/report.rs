use crate::analysis::{
    analyze_with_events, pause_time_distribution, window_stats, AnalysisResult, PauseBucket,
    WindowStats,
};
use crate::error::Result;
use crate::runtime::types::{GcEvent, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr, clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

/// Everything computed from one captured window.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub analysis: AnalysisResult,
    pub distribution: BTreeMap<PauseBucket, usize>,
    pub window: WindowStats,
    /// Reconstructed events per trigger label.
    pub triggers: BTreeMap<String, usize>,
}

impl Report {
    pub fn build(source: &str, snapshots: &[Snapshot], events: &[GcEvent]) -> Result<Self> {
        let analysis = analyze_with_events(snapshots, events)?;

        let mut triggers = BTreeMap::new();
        for event in events {
            *triggers.entry(event.trigger.to_string()).or_insert(0) += 1;
        }

        Ok(Self {
            source: source.to_string(),
            generated_at: Utc::now(),
            analysis,
            distribution: pause_time_distribution(events),
            window: window_stats(snapshots, events),
            triggers,
        })
    }
}

pub fn render(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &Report) -> String {
    let a = &report.analysis;
    let mut out = String::with_capacity(2048);

    // Writing to a String cannot fail.
    let _ = writeln!(out, "=== GC Analysis Report: {} ===", report.source);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Period:            {} ({} -> {})",
        format_duration(a.period),
        a.start_time.format("%Y-%m-%d %H:%M:%S"),
        a.end_time.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        out,
        "Samples:           {} snapshots, {} events",
        report.window.metric_count, report.window.event_count
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Collections");
    let _ = writeln!(out, "  Cycles:          {}", report.window.gc_count);
    let _ = writeln!(out, "  Frequency:       {:.2}/s", a.gc_frequency);
    let _ = writeln!(out, "  Avg interval:    {}", format_duration(a.avg_gc_interval));
    let _ = writeln!(out);

    let _ = writeln!(out, "Pause times");
    let _ = writeln!(out, "  Min:             {}", format_duration(a.min_pause_time));
    let _ = writeln!(out, "  Avg:             {}", format_duration(a.avg_pause_time));
    let _ = writeln!(out, "  Max:             {}", format_duration(a.max_pause_time));
    let _ = writeln!(out, "  P95:             {}", format_duration(a.p95_pause_time));
    let _ = writeln!(out, "  P99:             {}", format_duration(a.p99_pause_time));
    let _ = writeln!(out);

    let _ = writeln!(out, "Memory");
    let _ = writeln!(out, "  Avg heap:        {}", format_bytes(a.avg_heap_size));
    let _ = writeln!(out, "  Min heap:        {}", format_bytes(a.min_heap_size));
    let _ = writeln!(out, "  Max heap:        {}", format_bytes(a.max_heap_size));
    let _ = writeln!(out, "  Growth rate:     {}/s", format_signed_bytes(a.heap_growth_rate));
    let _ = writeln!(out);

    let _ = writeln!(out, "Allocation");
    let _ = writeln!(out, "  Rate:            {}/s", format_bytes(a.alloc_rate.max(0.0) as u64));
    let _ = writeln!(out, "  Objects:         {} allocated, {} freed", a.alloc_count, a.free_count);
    let _ = writeln!(out);

    let _ = writeln!(out, "Efficiency");
    let _ = writeln!(out, "  GC overhead:     {:.2}%", a.gc_overhead);
    let _ = writeln!(out, "  Memory use:      {:.2}%", a.memory_efficiency);
    let _ = writeln!(out);

    let _ = writeln!(out, "Pause distribution");
    for (bucket, count) in &report.distribution {
        let _ = writeln!(out, "  {:<10} {}", bucket.as_ref(), count);
    }

    if !report.triggers.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Triggers");
        for (trigger, count) in &report.triggers {
            let _ = writeln!(out, "  {:<10} {}", trigger, count);
        }
    }

    let _ = writeln!(out);
    if a.recommendations.is_empty() {
        let _ = writeln!(out, "No recommendations.");
    } else {
        let _ = writeln!(out, "Recommendations");
        for (i, recommendation) in a.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, recommendation);
        }
    }

    out
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

fn format_signed_bytes(bytes: f64) -> String {
    let magnitude = format_bytes(bytes.abs() as u64);
    if bytes < 0.0 {
        format!("-{}", magnitude)
    } else {
        magnitude
    }
}

fn format_duration(duration: Duration) -> String {
    if duration >= Duration::from_secs(1) {
        format!("{:.2}s", duration.as_secs_f64())
    } else if duration >= Duration::from_millis(1) {
        format!("{:.2}ms", duration.as_secs_f64() * 1_000.0)
    } else {
        format!("{:.1}µs", duration.as_secs_f64() * 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::TriggerReason;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const MIB: u64 = 1024 * 1024;

    fn snapshot(secs: i64, num_gc: u32, heap_alloc: u64) -> Snapshot {
        Snapshot {
            num_gc,
            pause_total_ns: 0,
            pauses: None,
            last_gc: None,
            heap_alloc,
            heap_peak: heap_alloc,
            heap_sys: 8 * MIB,
            heap_inuse: heap_alloc,
            next_gc: 8 * MIB,
            total_alloc: heap_alloc,
            mallocs: 0,
            frees: 0,
            gc_cpu_fraction: 0.02,
            timestamp: Utc.timestamp_opt(1_720_000_000 + secs, 0).unwrap(),
        }
    }

    fn event(sequence: u32, millis: u64, trigger: TriggerReason) -> GcEvent {
        let end = Utc.timestamp_opt(1_720_000_001, 0).unwrap();
        GcEvent {
            sequence,
            start: end,
            end,
            duration: Duration::from_millis(millis),
            trigger,
        }
    }

    fn sample_report() -> Report {
        let snapshots = vec![snapshot(0, 0, 4 * MIB), snapshot(2, 3, 6 * MIB)];
        let events = vec![
            event(1, 2, TriggerReason::HeapSize),
            event(2, 3, TriggerReason::HeapSize),
            event(3, 120, TriggerReason::Forced),
        ];
        Report::build("simulated", &snapshots, &events).unwrap()
    }

    #[test]
    fn test_build_counts_triggers() {
        let report = sample_report();
        assert_eq!(report.triggers.get("heap_size"), Some(&2));
        assert_eq!(report.triggers.get("forced"), Some(&1));
        assert_eq!(report.window.gc_count, 3);
        assert_eq!(report.distribution[&PauseBucket::OneToFiveMs], 2);
    }

    #[test]
    fn test_json_report_uses_bucket_labels() {
        let json = render(&sample_report(), ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source"], "simulated");
        assert_eq!(value["distribution"]["100ms+"], 1);
        assert_eq!(value["distribution"]["0-1ms"], 0);
        assert_eq!(value["window"]["metric_count"], 2);
    }

    #[test]
    fn test_text_report_sections() {
        let text = render(&sample_report(), ReportFormat::Text).unwrap();

        assert!(text.starts_with("=== GC Analysis Report: simulated ==="));
        assert!(text.contains("Frequency:       1.50/s"));
        assert!(text.contains("Max:             120.00ms"));
        assert!(text.contains("Growth rate:     1.00 MiB/s"));
        assert!(text.contains("100ms+"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(3 * MIB), "3.00 MiB");
        assert_eq!(format_signed_bytes(-2.0 * MIB as f64), "-2.00 MiB");
    }

    #[test]
    fn test_format_parses_from_label() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::Text.extension(), "txt");
    }
}
