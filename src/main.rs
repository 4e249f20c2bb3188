use clap::Parser;
use color_eyre::Result;
use gcwatch::{
    cli::Cli,
    config::Config,
    error::AppError,
    export,
    metrics::{Alert, Monitor, Severity},
    report::{self, Report},
    runtime::{
        jdk_tools::{detector::JdkTools, source::JstatSource},
        MetricsSource, SimulatedRuntime, Workload,
    },
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let config = cli.apply(config);
    config.validate()?;

    let mut workload = None;
    let source: Arc<dyn MetricsSource> = match cli.pid {
        Some(pid) => {
            let tools = JdkTools::detect();
            let jstat = match tools.jstat_path() {
                Ok(path) => path,
                Err(e) => {
                    eprintln!("{}", tools.installation_guidance());
                    return Err(AppError::from(e).into());
                }
            };
            Arc::new(JstatSource::with_jstat(pid, jstat))
        }
        None => {
            let runtime = Arc::new(SimulatedRuntime::new());
            workload = Some(tokio::spawn(Workload::default().run(runtime.clone())));
            runtime
        }
    };

    let monitor = Monitor::new(source.clone(), config.sampler_config(), log_alert);
    monitor.start(std::future::pending())?;

    wait_for_shutdown(cli.duration).await;
    monitor.stop().await;

    if let Some(workload) = workload {
        workload.abort();
    }

    let report = match Report::build(source.name(), &monitor.metrics(), &monitor.events()) {
        Ok(report) => report,
        Err(AppError::InsufficientData(n)) => {
            warn!(snapshots = n, "not enough samples to analyze; run for longer");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", report::render(&report, cli.format)?);

    if cli.export {
        let dir = config
            .export_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let path = export::export_report(&report, cli.format, dir.as_deref())?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

fn log_alert(alert: &Alert) {
    match alert.severity {
        Severity::Critical => error!(
            kind = %alert.kind,
            value = alert.value,
            threshold = alert.threshold,
            sequence = ?alert.sequence,
            "{}",
            alert.message
        ),
        Severity::Warning => warn!(
            kind = %alert.kind,
            value = alert.value,
            threshold = alert.threshold,
            sequence = ?alert.sequence,
            "{}",
            alert.message
        ),
    }
}

async fn wait_for_shutdown(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    match duration {
        Some(duration) => {
            info!(duration = %humantime::format_duration(duration), "sampling");
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = ctrl_c => info!("interrupted"),
            }
        }
        None => {
            info!("sampling until Ctrl-C");
            ctrl_c.await;
            info!("interrupted");
        }
    }
}
