//! Configuration resolution for dcr-bot
//!
//! **Priority:** command line → environment → TOML → compiled default.
//! clap merges the first two (every flag has an env fallback); the TOML file
//! and compiled defaults come from `dcr_common::config`.

use crate::relay::RelaySettings;
use clap::Parser;
use dcr_common::config::{
    default_config_path, load_toml_config, CompiledDefaults, ConverterConfig, LoggingConfig,
    TomlConfig,
};
use dcr_common::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Module name, also the TOML file stem
pub const MODULE_NAME: &str = "dcr-bot";

/// Command-line arguments (each with an environment fallback)
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "dcr-bot", version, about = "Chat bot that batches DOC/DOCX files into a ZIP of PDFs")]
pub struct CliArgs {
    /// TOML bootstrap file (default: <config_dir>/dcr/dcr-bot.toml)
    #[arg(long, env = "DCR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Public webhook URL to register with Telegram
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Listen address
    #[arg(long, env = "DCR_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "DCR_MAX_FILE_SIZE")]
    pub max_file_size: Option<u64>,

    /// Scratch directory for downloads, PDFs and archives
    #[arg(long, env = "DCR_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// LibreOffice executable
    #[arg(long, env = "DCR_CONVERTER")]
    pub converter: Option<String>,

    /// Conversion timeout in seconds
    #[arg(long, env = "DCR_CONVERSION_TIMEOUT")]
    pub conversion_timeout: Option<u64>,

    /// Bot API base URL
    #[arg(long, env = "DCR_TELEGRAM_API")]
    pub telegram_api_base: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DCR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log file (stderr when absent)
    #[arg(long, env = "DCR_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Write an example TOML file with the compiled defaults to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_example_config: Option<PathBuf>,
}

impl CliArgs {
    /// TOML file to load: explicit `--config`, else the platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| default_config_path(MODULE_NAME))
    }

    /// Read the TOML file named by [`config_path`](Self::config_path)
    ///
    /// Runs before tracing is initialised, so a missing file is returned as
    /// a notice for the caller to log instead of being logged here.
    pub fn load_toml(&self) -> Result<(TomlConfig, Vec<String>)> {
        let Some(path) = self.config_path() else {
            return Ok((
                TomlConfig::default(),
                vec!["No config directory on this platform, using command line, environment and compiled defaults".to_string()],
            ));
        };

        let mut notices = Vec::new();
        if !path.exists() {
            notices.push(format!(
                "Config file {} not found, using command line, environment and compiled defaults",
                path.display()
            ));
        }
        Ok((load_toml_config(&path)?, notices))
    }
}

/// Example bootstrap file: every compiled default spelled out, no token
pub fn example_toml() -> TomlConfig {
    let defaults = CompiledDefaults::for_current_platform();
    TomlConfig {
        bot_token: None,
        webhook_url: None,
        host: Some(defaults.host),
        port: Some(defaults.port),
        max_file_size_bytes: Some(defaults.max_file_size_bytes),
        work_dir: Some(defaults.work_dir),
        telegram_api_base: Some(defaults.telegram_api_base),
        converter: ConverterConfig {
            command: Some(defaults.converter_command),
            timeout_secs: Some(defaults.conversion_timeout_secs),
        },
        logging: LoggingConfig {
            level: defaults.log_level,
            file: None,
        },
    }
}

/// Fully resolved service configuration
#[derive(Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub webhook_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub max_file_size_bytes: u64,
    pub work_dir: PathBuf,
    pub telegram_api_base: String,
    pub converter_command: String,
    pub conversion_timeout: Duration,
    pub logging: LoggingConfig,
    /// Warnings raised while resolving, logged once tracing is up
    pub notices: Vec<String>,
}

// Manual impl so the token never reaches a log line
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("webhook_url", &self.webhook_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("work_dir", &self.work_dir)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("converter_command", &self.converter_command)
            .field("conversion_timeout", &self.conversion_timeout)
            .field("logging", &self.logging)
            .field("notices", &self.notices)
            .finish()
    }
}

/// Non-empty, non-whitespace value
fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

impl BotConfig {
    /// Merge CLI/environment values over the TOML file over compiled defaults
    pub fn resolve(cli: &CliArgs, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let mut notices = Vec::new();

        let cli_token = cli.bot_token.as_deref().filter(|t| is_set(t));
        let toml_token = toml.bot_token.as_deref().filter(|t| is_set(t));
        if cli_token.is_some() && toml_token.is_some() {
            notices.push(
                "Bot token found in both environment/command line and TOML. Using environment/command line."
                    .to_string(),
            );
        }
        let bot_token = cli_token
            .or(toml_token)
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                Error::Config(
                    "Telegram bot token not configured. Provide it with one of:\n\
                     1. Command line: --bot-token <token>\n\
                     2. Environment: TELEGRAM_BOT_TOKEN=<token>\n\
                     3. TOML config: bot_token = \"<token>\""
                        .to_string(),
                )
            })?;

        let max_file_size_bytes = cli
            .max_file_size
            .or(toml.max_file_size_bytes)
            .unwrap_or(defaults.max_file_size_bytes);
        if max_file_size_bytes == 0 {
            return Err(Error::Config("max file size must be greater than 0".to_string()));
        }

        let timeout_secs = cli
            .conversion_timeout
            .or(toml.converter.timeout_secs)
            .unwrap_or(defaults.conversion_timeout_secs);
        if timeout_secs == 0 {
            return Err(Error::Config("conversion timeout must be greater than 0".to_string()));
        }

        let mut logging = toml.logging.clone();
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(file) = &cli.log_file {
            logging.file = Some(file.clone());
        }

        Ok(Self {
            bot_token,
            webhook_url: cli
                .webhook_url
                .clone()
                .or_else(|| toml.webhook_url.clone())
                .filter(|u| is_set(u)),
            host: cli
                .host
                .clone()
                .or_else(|| toml.host.clone())
                .unwrap_or(defaults.host),
            port: cli.port.or(toml.port).unwrap_or(defaults.port),
            max_file_size_bytes,
            work_dir: cli
                .work_dir
                .clone()
                .or_else(|| toml.work_dir.clone())
                .unwrap_or(defaults.work_dir),
            telegram_api_base: cli
                .telegram_api_base
                .clone()
                .or_else(|| toml.telegram_api_base.clone())
                .unwrap_or(defaults.telegram_api_base),
            converter_command: cli
                .converter
                .clone()
                .or_else(|| toml.converter.command.clone())
                .unwrap_or(defaults.converter_command),
            conversion_timeout: Duration::from_secs(timeout_secs),
            logging,
            notices,
        })
    }

    /// `host:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            max_file_size_bytes: self.max_file_size_bytes,
            work_dir: self.work_dir.clone(),
            conversion_timeout: self.conversion_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_token() -> CliArgs {
        CliArgs {
            bot_token: Some("1:cli".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_apply_when_nothing_set() {
        let config = BotConfig::resolve(&cli_with_token(), &TomlConfig::default()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.conversion_timeout, Duration::from_secs(120));
        assert_eq!(config.converter_command, "soffice");
        assert!(config.webhook_url.is_none());
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig {
            bot_token: Some("2:toml".to_string()),
            port: Some(7000),
            max_file_size_bytes: Some(1024),
            converter: ConverterConfig {
                command: Some("libreoffice".to_string()),
                timeout_secs: Some(30),
            },
            ..Default::default()
        };
        let cli = CliArgs {
            port: Some(8080),
            ..cli_with_token()
        };

        let config = BotConfig::resolve(&cli, &toml).unwrap();
        assert_eq!(config.bot_token, "1:cli");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_file_size_bytes, 1024);
        assert_eq!(config.converter_command, "libreoffice");
        assert_eq!(config.conversion_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_token_in_both_sources_is_noticed() {
        let toml = TomlConfig {
            bot_token: Some("2:toml".to_string()),
            ..Default::default()
        };
        let config = BotConfig::resolve(&cli_with_token(), &toml).unwrap();
        assert_eq!(config.bot_token, "1:cli");
        assert_eq!(config.notices.len(), 1);
        assert!(config.notices[0].contains("both"), "{:?}", config.notices);

        let config = BotConfig::resolve(&cli_with_token(), &TomlConfig::default()).unwrap();
        assert!(config.notices.is_empty());
    }

    #[test]
    fn test_token_from_toml() {
        let toml = TomlConfig {
            bot_token: Some("  3:toml  ".to_string()),
            ..Default::default()
        };
        let config = BotConfig::resolve(&CliArgs::default(), &toml).unwrap();
        assert_eq!(config.bot_token, "3:toml");
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let cli = CliArgs {
            bot_token: Some("   ".to_string()),
            ..Default::default()
        };
        let err = BotConfig::resolve(&cli, &TomlConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let cli = CliArgs {
            max_file_size: Some(0),
            ..cli_with_token()
        };
        assert!(BotConfig::resolve(&cli, &TomlConfig::default()).is_err());

        let cli = CliArgs {
            conversion_timeout: Some(0),
            ..cli_with_token()
        };
        assert!(BotConfig::resolve(&cli, &TomlConfig::default()).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = BotConfig::resolve(&cli_with_token(), &TomlConfig::default()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("1:cli"));
    }

    #[test]
    fn test_example_toml_resolves_to_defaults() {
        let example = example_toml();
        assert!(example.bot_token.is_none());

        let from_example = BotConfig::resolve(&cli_with_token(), &example).unwrap();
        let from_nothing = BotConfig::resolve(&cli_with_token(), &TomlConfig::default()).unwrap();
        assert_eq!(format!("{:?}", from_example), format!("{:?}", from_nothing));
    }

    #[test]
    fn test_log_overrides() {
        let cli = CliArgs {
            log_level: Some("debug".to_string()),
            ..cli_with_token()
        };
        let config = BotConfig::resolve(&cli, &TomlConfig::default()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file.is_none());
    }
}
