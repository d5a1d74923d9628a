//! Config file discovery, loading and saving.
//!
//! Resolution order for the config directory:
//! 1. An explicit directory (the CLI's `--config-dir`)
//! 2. `INOPY_CONFIG_DIR`
//! 3. `~/.inopy/config`

use std::path::{Path, PathBuf};

use crate::{ConfigError, InopyConfig, Result};

/// Config filename within the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "INOPY_CONFIG_DIR";

/// Application directory under the user's home.
const APP_DIR: &str = ".inopy";

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: InopyConfig,
    pub path: PathBuf,
}

/// Base application directory (`~/.inopy`).
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or(ConfigError::NoHomeDir)
}

/// Resolve the config directory.
pub fn config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    Ok(base_dir()?.join("config"))
}

/// Full path of the config file.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    Ok(config_dir(explicit)?.join(CONFIG_FILE))
}

/// Directory for rolling log files.
///
/// `~/.inopy/logs` by default; `<dir>/logs` when the config directory is
/// overridden so separate instances keep separate logs.
pub fn log_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if explicit.is_some() || std::env::var(CONFIG_DIR_ENV).is_ok_and(|d| !d.is_empty()) {
        return Ok(config_dir(explicit)?.join("logs"));
    }
    Ok(base_dir()?.join("logs"))
}

/// Discover and load the config file.
///
/// A missing file is reported as [`ConfigError::NotFound`]; nothing is created.
pub fn load_config(explicit_dir: Option<&Path>) -> Result<LoadedConfig> {
    let path = config_path(explicit_dir)?;
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }
    let config = load_config_file(&path)?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(LoadedConfig { config, path })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<InopyConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    InopyConfig::from_json(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist. The file holds client
/// secrets and tokens, so it is made owner-only on Unix.
pub fn save_config(config: &InopyConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_json()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| {
            ConfigError::WriteFile {
                path: path.display().to_string(),
                source: e,
            }
        })?;
    }

    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}
