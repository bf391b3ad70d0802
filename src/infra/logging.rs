//! Log output for the process. Stdout belongs to the terminal UI, so events
//! go to a daily rotated file instead.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

const LOG_FILE_PREFIX: &str = "lovechat.log";

/// Installs the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard, AppError> {
    let directory = resolve_log_dir(config);
    fs::create_dir_all(&directory).map_err(|source| AppError::LogDirCreate {
        path: directory.clone(),
        source,
    })?;

    let appender = rolling::daily(&directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(AppError::LoggingInit)?;

    tracing::debug!(directory = %directory.display(), "logging initialized");
    Ok(guard)
}

pub fn resolve_log_dir(config: &LogConfig) -> PathBuf {
    config
        .directory
        .clone()
        .unwrap_or_else(|| default_log_dir(dirs::data_local_dir().as_deref()))
}

fn default_log_dir(data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lovechat")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directory_wins() {
        let config = LogConfig {
            level: "info".to_owned(),
            directory: Some(PathBuf::from("/tmp/lovechat-logs")),
        };

        assert_eq!(resolve_log_dir(&config), PathBuf::from("/tmp/lovechat-logs"));
    }

    #[test]
    fn default_directory_lives_under_data_dir() {
        assert_eq!(
            default_log_dir(Some(Path::new("/home/alice/.local/share"))),
            PathBuf::from("/home/alice/.local/share/lovechat/logs")
        );
        assert_eq!(
            default_log_dir(None),
            PathBuf::from("./lovechat/logs")
        );
    }
}
