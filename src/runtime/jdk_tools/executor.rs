use super::JdkToolsError;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a JDK tool and returns its stdout. A non-zero exit is an error since
/// jstat reports a vanished target process that way.
pub async fn run_tool(
    tool: &Path,
    args: &[&str],
    timeout_duration: Option<Duration>,
) -> Result<String, JdkToolsError> {
    let command_line = format!("{} {}", tool.display(), args.join(" "));
    let output = Command::new(tool).args(args).kill_on_drop(true).output();

    let output = timeout(timeout_duration.unwrap_or(DEFAULT_TIMEOUT), output)
        .await
        .map_err(|_| JdkToolsError::Timeout {
            command: command_line.clone(),
        })?
        .map_err(|e| JdkToolsError::ExecutionFailed {
            command: command_line.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(JdkToolsError::NonZeroExit {
            command: command_line,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
