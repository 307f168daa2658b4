use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anomaly::{AlertSettings, AlertSettingsError};

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub alerts: AlertSettings,
    pub currency: CurrencyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurrencyConfig {
    /// Currency anomaly checks normalize history into.
    pub reference: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub reference_currency: Option<String>,
    pub alerts: Option<AlertSettings>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("configuration validation failed: {0}")]
    AlertSettings(#[from] AlertSettingsError),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            alerts: AlertSettings::default(),
            currency: CurrencyConfig { reference: "EUR".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("solbill.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        // Missing alert fields fall back to defaults through `#[serde(default)]`.
        if let Some(alerts) = patch.alerts {
            self.alerts = alerts;
        }

        if let Some(currency) = patch.currency {
            if let Some(reference) = currency.reference {
                self.currency.reference = reference;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SOLBILL_ALERTS_INVOICE_INCREASE_ENABLED") {
            self.alerts.invoice_increase_enabled =
                parse_bool("SOLBILL_ALERTS_INVOICE_INCREASE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_INVOICE_INCREASE_WARNING") {
            self.alerts.invoice_increase_warning =
                parse_f64("SOLBILL_ALERTS_INVOICE_INCREASE_WARNING", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_INVOICE_INCREASE_CRITICAL") {
            self.alerts.invoice_increase_critical =
                parse_f64("SOLBILL_ALERTS_INVOICE_INCREASE_CRITICAL", &value)?;
        }

        if let Some(value) = read_env("SOLBILL_ALERTS_INVOICE_HISTORY_DEPTH") {
            self.alerts.invoice_history_depth =
                parse_usize("SOLBILL_ALERTS_INVOICE_HISTORY_DEPTH", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_INVOICE_HISTORY_MINIMUM") {
            self.alerts.invoice_history_minimum =
                parse_usize("SOLBILL_ALERTS_INVOICE_HISTORY_MINIMUM", &value)?;
        }

        if let Some(value) = read_env("SOLBILL_ALERTS_MW_DECREASE_ENABLED") {
            self.alerts.mw_decrease_enabled =
                parse_bool("SOLBILL_ALERTS_MW_DECREASE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_MW_DECREASE_THRESHOLD") {
            self.alerts.mw_decrease_threshold =
                parse_f64("SOLBILL_ALERTS_MW_DECREASE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("SOLBILL_ALERTS_SITE_DECREASE_ENABLED") {
            self.alerts.site_decrease_enabled =
                parse_bool("SOLBILL_ALERTS_SITE_DECREASE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_SITE_DECREASE_THRESHOLD") {
            self.alerts.site_decrease_threshold =
                parse_u32("SOLBILL_ALERTS_SITE_DECREASE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("SOLBILL_ALERTS_ASSET_MANIPULATION_ENABLED") {
            self.alerts.asset_manipulation_enabled =
                parse_bool("SOLBILL_ALERTS_ASSET_MANIPULATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_ASSET_MANIPULATION_WINDOW_DAYS") {
            self.alerts.asset_manipulation_window_days =
                parse_i64("SOLBILL_ALERTS_ASSET_MANIPULATION_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("SOLBILL_ALERTS_ASSET_MANIPULATION_THRESHOLD") {
            self.alerts.asset_manipulation_threshold =
                parse_f64("SOLBILL_ALERTS_ASSET_MANIPULATION_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("SOLBILL_CURRENCY_REFERENCE") {
            self.currency.reference = value;
        }

        let log_level = read_env("SOLBILL_LOGGING_LEVEL").or_else(|| read_env("SOLBILL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SOLBILL_LOGGING_FORMAT").or_else(|| read_env("SOLBILL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(reference_currency) = overrides.reference_currency {
            self.currency.reference = reference_currency;
        }
        if let Some(alerts) = overrides.alerts {
            self.alerts = alerts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.alerts.validate()?;
        validate_currency(&self.currency)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("solbill.toml"), PathBuf::from("config/solbill.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_currency(currency: &CurrencyConfig) -> Result<(), ConfigError> {
    let code = currency.reference.trim();
    if code.len() != 3 || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "currency.reference must be a three-letter ISO 4217 code in upper case (got `{code}`)"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    alerts: Option<AlertSettings>,
    currency: Option<CurrencyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrencyPatch {
    reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
