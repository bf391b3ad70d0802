use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::infra::{
    config::{loader::{load, load_with_env}, AppConfig},
    contracts::ConfigAdapter,
};

/// Reads `config.toml` (or the `--config` path), then the `LOVECHAT_*`
/// environment overrides unless they are switched off.
#[derive(Debug, Clone)]
pub struct FileConfigAdapter {
    path: Option<PathBuf>,
    env_overrides: bool,
}

impl FileConfigAdapter {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            env_overrides: true,
        }
    }

    /// File and defaults only.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn without_env(path: Option<&Path>) -> Self {
        Self {
            env_overrides: false,
            ..Self::new(path)
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        let config = if self.env_overrides {
            load(self.path.as_deref())?
        } else {
            load_with_env(self.path.as_deref(), |_| None)?
        };

        Ok(config)
    }
}
