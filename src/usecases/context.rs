use tracing_appender::non_blocking::WorkerGuard;

use crate::{infra::config::AppConfig, usecases::contracts::MessageStore};

/// Which store backs the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Online,
    /// In-process loopback table; nothing leaves the machine.
    Offline,
}

pub struct AppContext {
    pub config: AppConfig,
    pub mode: StoreMode,
    pub store: Box<dyn MessageStore>,
    _log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(config: AppConfig, mode: StoreMode, store: Box<dyn MessageStore>) -> Self {
        Self {
            config,
            mode,
            store,
            _log_guard: None,
        }
    }

    pub fn with_log_guard(mut self, guard: WorkerGuard) -> Self {
        self._log_guard = Some(guard);
        self
    }
}
