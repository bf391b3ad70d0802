mod adapter;
mod app_config;
mod file_config;
mod loader;

pub use adapter::FileConfigAdapter;
pub use app_config::{AppConfig, BackendConfig, LogConfig, RealtimeConfig, UiConfig};
pub use loader::{validate_online, ANON_KEY_ENV, BACKEND_URL_ENV};
