pub mod detector;
pub mod executor;
pub mod parser;
pub mod source;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JdkToolsError {
    #[error("jstat not found in JAVA_HOME or PATH")]
    JstatNotFound,

    #[error("Failed to execute {command}: {source}")]
    ExecutionFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Command timed out: {command}")]
    Timeout { command: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}
