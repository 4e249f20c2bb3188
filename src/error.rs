use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("sampler is already running")]
    AlreadyRunning,

    #[error("insufficient data for analysis: need at least 2 snapshots, got {0}")]
    InsufficientData(usize),

    #[error("JDK tools error: {0}")]
    JdkTools(#[from] crate::runtime::jdk_tools::JdkToolsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
