use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub const BACKEND_URL_ENV: &str = "LOVECHAT_BACKEND_URL";
pub const ANON_KEY_ENV: &str = "LOVECHAT_ANON_KEY";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    load_with_env(path, |key| env::var(key).ok())
}

pub(crate) fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<AppConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if config_path.exists() {
        let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;

        let file_config: FileConfig =
            toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
                path: config_path,
                source,
            })?;

        file_config.merge_into(&mut config);
    }

    apply_env_overrides(&mut config, lookup);
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(BACKEND_URL_ENV).filter(|value| !value.trim().is_empty()) {
        config.backend.url = url;
    }

    if let Some(key) = lookup(ANON_KEY_ENV).filter(|value| !value.trim().is_empty()) {
        config.backend.anon_key = key;
    }
}

/// Checks the settings an online session cannot run without.
pub fn validate_online(config: &AppConfig) -> Result<(), AppError> {
    let backend = &config.backend;

    if backend.url.trim().is_empty() {
        return Err(invalid(format!(
            "backend.url is empty; set it in the config file or {BACKEND_URL_ENV}"
        )));
    }

    if !(backend.url.starts_with("https://") || backend.url.starts_with("http://")) {
        return Err(invalid("backend.url must start with http:// or https://"));
    }

    if backend.anon_key.trim().is_empty() {
        return Err(invalid(format!(
            "backend.anon_key is empty; set it in the config file or {ANON_KEY_ENV}"
        )));
    }

    if backend.table.trim().is_empty() {
        return Err(invalid("backend.table must not be empty"));
    }

    if backend.request_timeout_ms == 0 {
        return Err(invalid("backend.request_timeout_ms must be positive"));
    }

    if config.realtime.heartbeat_interval_ms == 0 {
        return Err(invalid("realtime.heartbeat_interval_ms must be positive"));
    }

    if config.realtime.join_timeout_ms == 0 {
        return Err(invalid("realtime.join_timeout_ms must be positive"));
    }

    Ok(())
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::ConfigInvalid {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_lock;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn online_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.backend.url = "https://demo.supabase.co".to_owned();
        config.backend.anon_key = "anon".to_owned();
        config
    }

    #[test]
    fn returns_defaults_when_file_is_missing() {
        let config = load_with_env(Some(Path::new("./missing-config.toml")), no_env)
            .expect("config must load");

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn merges_file_values_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"[logging]
level = "debug"

[backend]
url = "https://demo.supabase.co"
anon_key = "abc"

[ui]
notice_ttl_ms = 1500
"#,
        )
        .expect("must write test config");

        let config = load_with_env(Some(&config_path), no_env).expect("config must load");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.backend.url, "https://demo.supabase.co");
        assert_eq!(config.backend.anon_key, "abc");
        assert_eq!(config.backend.table, "messages");
        assert_eq!(config.realtime.heartbeat_interval_ms, 25_000);
        assert_eq!(config.realtime.join_timeout_ms, 10_000);
        assert_eq!(config.ui.notice_ttl_ms, 1_500);
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[backend\nurl = 1").expect("must write test config");

        let error = load_with_env(Some(&config_path), no_env).expect_err("must fail to parse");

        assert!(matches!(error, AppError::ConfigParse { ref path, .. } if path == &config_path));
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[backend]\nurl = \"https://file.example\"\nanon_key = \"file-key\"\n",
        )
        .expect("must write test config");

        let config = load_with_env(Some(&config_path), |key| match key {
            BACKEND_URL_ENV => Some("https://env.example".to_owned()),
            ANON_KEY_ENV => Some("  ".to_owned()),
            _ => None,
        })
        .expect("config must load");

        assert_eq!(config.backend.url, "https://env.example");
        assert_eq!(config.backend.anon_key, "file-key");
    }

    #[test]
    fn load_reads_process_environment() {
        let _guard = env_lock();
        let previous = env::var_os(ANON_KEY_ENV);
        env::set_var(ANON_KEY_ENV, "from-env");

        let config = load(Some(Path::new("./missing-config.toml")));

        match previous {
            Some(value) => env::set_var(ANON_KEY_ENV, value),
            None => env::remove_var(ANON_KEY_ENV),
        }

        assert_eq!(config.expect("config must load").backend.anon_key, "from-env");
    }

    #[test]
    fn online_mode_requires_url_and_key() {
        let mut config = online_config();
        assert!(validate_online(&config).is_ok());

        config.backend.url.clear();
        assert!(matches!(
            validate_online(&config),
            Err(AppError::ConfigInvalid { .. })
        ));

        let mut config = online_config();
        config.backend.anon_key = "   ".to_owned();
        assert!(matches!(
            validate_online(&config),
            Err(AppError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn rejects_non_http_url_and_zero_intervals() {
        let mut config = online_config();
        config.backend.url = "ftp://demo".to_owned();
        assert!(validate_online(&config).is_err());

        let mut config = online_config();
        config.realtime.heartbeat_interval_ms = 0;
        assert!(validate_online(&config).is_err());

        let mut config = online_config();
        config.realtime.join_timeout_ms = 0;
        assert!(validate_online(&config).is_err());
    }
}
