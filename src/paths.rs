//! Default locations for the configuration file and logs.
//!
//! - **Local mode**: a `config.yaml` in the working directory wins; logs go
//!   to `./logs`. This is what `cargo run` from a checkout picks up.
//! - **User mode** (default): config in the platform config directory
//!   (`~/.config/midictrl` on Linux) and logs in the platform data
//!   directory (`~/.local/share/midictrl/logs`).

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name used under the platform directories
const APP_DIR: &str = "midictrl";

const CONFIG_FILE: &str = "config.yaml";

/// Resolved paths for config and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
    /// Whether the config was found in the working directory
    pub is_local: bool,
}

impl AppPaths {
    /// Detect the paths for the current environment.
    ///
    /// Called before logging is initialized.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(&cwd, dirs::config_dir(), dirs::data_dir())
    }

    /// Pick local or user mode from explicit base directories
    pub fn resolve(cwd: &Path, config_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        let local_config = cwd.join(CONFIG_FILE);
        if local_config.exists() {
            return Self {
                config: local_config,
                logs_dir: cwd.join("logs"),
                is_local: true,
            };
        }

        let config_base = config_dir.unwrap_or_else(|| cwd.to_path_buf()).join(APP_DIR);
        let data_base = data_dir.unwrap_or_else(|| cwd.to_path_buf()).join(APP_DIR);

        Self {
            config: config_base.join(CONFIG_FILE),
            logs_dir: data_base.join("logs"),
            is_local: false,
        }
    }
}

/// Create `dir` and its parents if needed
pub fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.exists() {
        debug!("Creating directory: {}", dir.display());
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}
