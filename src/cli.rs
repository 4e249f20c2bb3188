use crate::config::Config;
use crate::report::ReportFormat;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gcwatch")]
#[command(author = "Anurag Ambuj")]
#[command(version)]
#[command(about = "Sample GC activity and report pauses, memory growth and allocation", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Sample a JVM process through jstat instead of the simulated runtime")]
    pub pid: Option<u32>,

    #[arg(
        short = 'i',
        long,
        help = "Sampling interval (e.g. 500ms, 1s, 2s)",
        value_parser = parse_duration
    )]
    pub interval: Option<Duration>,

    #[arg(
        short = 'd',
        long,
        help = "Stop after this long (e.g. 30s, 5m); runs until Ctrl-C otherwise",
        value_parser = parse_duration
    )]
    pub duration: Option<Duration>,

    #[arg(short = 'n', long, help = "Maximum snapshots and events kept in memory")]
    pub max_samples: Option<usize>,

    #[arg(long, help = "Drop pause buffers from retained snapshots")]
    pub lite: bool,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text, help = "Report format")]
    pub format: ReportFormat,

    #[arg(short, long, help = "Also write the report to a file")]
    pub export: bool,

    #[arg(short, long, help = "Directory for exported reports")]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        help = "Path to configuration file",
        env = "GCWATCH_CONFIG"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(interval) = self.interval {
            config.sampling_interval = interval;
        }
        if let Some(max_samples) = self.max_samples {
            config.max_samples = max_samples;
        }
        if self.lite {
            config.retain_pause_buffers = false;
        }
        if let Some(output) = &self.output {
            config.export_dir = Some(output.clone());
        }
        config
    }
}

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gcwatch"]).unwrap();
        assert_eq!(cli.pid, None);
        assert_eq!(cli.format, ReportFormat::Text);
        assert!(!cli.export);
        assert_eq!(cli.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "gcwatch",
            "--interval",
            "250ms",
            "--duration",
            "1m",
            "--max-samples",
            "50",
            "--lite",
            "--format",
            "json",
            "--output",
            "/tmp/gc",
        ])
        .unwrap();

        assert_eq!(cli.duration, Some(Duration::from_secs(60)));
        assert_eq!(cli.format, ReportFormat::Json);

        let config = cli.apply(Config::default());
        assert_eq!(config.sampling_interval, Duration::from_millis(250));
        assert_eq!(config.max_samples, 50);
        assert!(!config.retain_pause_buffers);
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/gc")));
    }

    #[test]
    fn test_rejects_bad_interval() {
        assert!(Cli::try_parse_from(["gcwatch", "--interval", "soon"]).is_err());
    }
}
