//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Tiers 1 and 2 are merged by the service's CLI parser; this module owns the
//! TOML file and the compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compiled defaults used when neither CLI, environment nor TOML supply a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub max_file_size_bytes: u64,
    pub work_dir: PathBuf,
    pub telegram_api_base: String,
    pub converter_command: String,
    pub conversion_timeout_secs: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the current platform
    pub fn for_current_platform() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_file_size_bytes: 50 * 1024 * 1024,
            work_dir: std::env::temp_dir().join("dcr-bot"),
            telegram_api_base: "https://api.telegram.org".to_string(),
            converter_command: "soffice".to_string(),
            conversion_timeout_secs: 120,
            log_level: "info".to_string(),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent fields fall through to the compiled
/// defaults. Changes require a restart.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Telegram bot token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Public URL Telegram should deliver updates to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Listen address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Listen port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Largest accepted upload, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size_bytes: Option<u64>,

    /// Scratch area for downloads, converted files and archives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Bot API base URL (overridable for a local Bot API server)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_api_base: Option<String>,

    /// Conversion engine settings
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conversion engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConverterConfig {
    /// Office suite executable (e.g. `soffice`, `libreoffice`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Seconds before a conversion is abandoned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default location of a module's TOML file: `<config_dir>/dcr/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dcr").join(format!("{}.toml", module_name)))
}

/// Load the TOML bootstrap file
///
/// A missing file is not an error: defaults are returned so the service can
/// still start from CLI/environment values. Nothing is logged: the file is
/// read before tracing is initialised, so callers report a missing file.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(config)
}

/// Write a TOML config atomically (temp file + rename)
///
/// The file may hold the bot token, so on Unix it is created with 0600.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    Ok(())
}
