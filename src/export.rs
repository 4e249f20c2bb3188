use crate::error::Result;
use crate::report::{render, Report, ReportFormat};
use chrono::Local;
use std::path::PathBuf;
use tracing::info;

/// Directory reports are written to: `base_dir` with `~` expanded, or the
/// platform data directory.
pub fn export_dir(base_dir: Option<&str>) -> PathBuf {
    if let Some(custom_dir) = base_dir {
        PathBuf::from(shellexpand::tilde(custom_dir).to_string())
    } else {
        directories::ProjectDirs::from("com", "gcwatch", "gcwatch")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn export_report(
    report: &Report,
    format: ReportFormat,
    base_dir: Option<&str>,
) -> Result<PathBuf> {
    let dir = export_dir(base_dir);
    std::fs::create_dir_all(&dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("gc_report_{}.{}", timestamp, format.extension());
    let filepath = dir.join(&filename);

    std::fs::write(&filepath, render(report, format)?)?;
    info!(path = %filepath.display(), %format, "report exported");

    Ok(filepath)
}
