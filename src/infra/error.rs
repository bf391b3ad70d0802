use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to create log directory at {path}: {source}")]
    LogDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start the async runtime: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("failed to build the HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigRead { .. } => "CONFIG_READ_FAILED",
            Self::ConfigParse { .. } => "CONFIG_PARSE_FAILED",
            Self::ConfigInvalid { .. } => "CONFIG_INVALID",
            Self::LoggingInit(_) => "LOGGING_INIT_FAILED",
            Self::LogDirCreate { .. } => "LOG_DIR_CREATE_FAILED",
            Self::RuntimeInit(_) => "RUNTIME_INIT_FAILED",
            Self::HttpClientInit(_) => "HTTP_CLIENT_INIT_FAILED",
        }
    }
}
