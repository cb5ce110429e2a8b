use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid run request: {0}")]
    InvalidRequest(String),

    #[error("external tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("a run is already in progress")]
    RunInProgress,

    #[error("worker error: {0}")]
    Worker(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("install failed: {0}")]
    Install(String),
}

pub type AppResult<T> = Result<T, AppError>;
