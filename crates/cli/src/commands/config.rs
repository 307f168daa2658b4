use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use solbill_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(options: &LoadOptions, config: &AppConfig) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let entries = effective_entries(config, config_file_doc.as_ref(), config_file_path.as_deref());

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        &entries,
    )
}

fn effective_entries(
    config: &AppConfig,
    doc: Option<&Value>,
    path: Option<&Path>,
) -> Vec<ConfigEntry> {
    let alerts = &config.alerts;
    let fields: [(&'static str, &'static [&'static str], String); 15] = [
        (
            "alerts.invoice_increase_enabled",
            &["SOLBILL_ALERTS_INVOICE_INCREASE_ENABLED"],
            alerts.invoice_increase_enabled.to_string(),
        ),
        (
            "alerts.invoice_increase_warning",
            &["SOLBILL_ALERTS_INVOICE_INCREASE_WARNING"],
            alerts.invoice_increase_warning.to_string(),
        ),
        (
            "alerts.invoice_increase_critical",
            &["SOLBILL_ALERTS_INVOICE_INCREASE_CRITICAL"],
            alerts.invoice_increase_critical.to_string(),
        ),
        (
            "alerts.invoice_history_depth",
            &["SOLBILL_ALERTS_INVOICE_HISTORY_DEPTH"],
            alerts.invoice_history_depth.to_string(),
        ),
        (
            "alerts.invoice_history_minimum",
            &["SOLBILL_ALERTS_INVOICE_HISTORY_MINIMUM"],
            alerts.invoice_history_minimum.to_string(),
        ),
        (
            "alerts.mw_decrease_enabled",
            &["SOLBILL_ALERTS_MW_DECREASE_ENABLED"],
            alerts.mw_decrease_enabled.to_string(),
        ),
        (
            "alerts.mw_decrease_threshold",
            &["SOLBILL_ALERTS_MW_DECREASE_THRESHOLD"],
            alerts.mw_decrease_threshold.to_string(),
        ),
        (
            "alerts.site_decrease_enabled",
            &["SOLBILL_ALERTS_SITE_DECREASE_ENABLED"],
            alerts.site_decrease_enabled.to_string(),
        ),
        (
            "alerts.site_decrease_threshold",
            &["SOLBILL_ALERTS_SITE_DECREASE_THRESHOLD"],
            alerts.site_decrease_threshold.to_string(),
        ),
        (
            "alerts.asset_manipulation_enabled",
            &["SOLBILL_ALERTS_ASSET_MANIPULATION_ENABLED"],
            alerts.asset_manipulation_enabled.to_string(),
        ),
        (
            "alerts.asset_manipulation_window_days",
            &["SOLBILL_ALERTS_ASSET_MANIPULATION_WINDOW_DAYS"],
            alerts.asset_manipulation_window_days.to_string(),
        ),
        (
            "alerts.asset_manipulation_threshold",
            &["SOLBILL_ALERTS_ASSET_MANIPULATION_THRESHOLD"],
            alerts.asset_manipulation_threshold.to_string(),
        ),
        ("currency.reference", &["SOLBILL_CURRENCY_REFERENCE"], config.currency.reference.clone()),
        (
            "logging.level",
            &["SOLBILL_LOGGING_LEVEL", "SOLBILL_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["SOLBILL_LOGGING_FORMAT", "SOLBILL_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ];

    fields
        .into_iter()
        .map(|(key, env_keys, value)| ConfigEntry {
            key,
            value,
            source: field_source(key, env_keys, doc, path),
        })
        .collect()
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
