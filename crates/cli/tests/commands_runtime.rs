use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use clap::Parser;
use serde_json::{json, Value};
use solbill_cli::commands::{check, config, evaluate, price, tiers};
use solbill_cli::{execute, Cli};
use solbill_core::config::{AppConfig, LoadOptions};
use tempfile::TempDir;

#[test]
fn price_returns_invoice_for_graduated_contract() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_json(
        dir.path(),
        "contract.json",
        &json!({
            "pricing_model": "graduated_mw_tiers",
            "total_mw": 25.0,
            "currency": "EUR",
            "mw_tiers": [
                { "minimum": 0.0, "maximum": 10.0, "rate": 100.0 },
                { "minimum": 10.0, "maximum": 30.0, "rate": 80.0 },
                { "minimum": 30.0, "rate": 50.0 }
            ]
        }),
    );

    let result = price::run(&input);
    assert_eq!(result.exit_code, 0, "expected successful pricing: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "price");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["invoice"]["total_price"], 2200.0);
    assert_eq!(payload["data"]["presented_total"], "2200.00");
    assert_eq!(payload["data"]["non_recurring_total"], 0.0);
}

#[test]
fn price_applies_override_and_quarterly_frequency() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_json(
        dir.path(),
        "contract.json",
        &json!({
            "pricing_model": "per_mw_modules",
            "total_mw": 10.0,
            "currency": "EUR",
            "frequency": "quarterly",
            "modules": [{
                "definition": {
                    "id": "monitoring",
                    "name": "Monitoring",
                    "pricing": { "mode": "fixed", "price": 100.0 }
                }
            }],
            "addons": [{
                "definition": {
                    "id": "reporting",
                    "name": "Regulatory reporting",
                    "pricing": { "mode": "complexity", "low": 200.0, "medium": 1500.0 }
                },
                "complexity": "low",
                "custom_price": 999.0
            }]
        }),
    );

    let result = price::run(&input);
    assert_eq!(result.exit_code, 0, "expected successful pricing: {}", result.output);

    let payload = parse_payload(&result.output);
    let invoice = &payload["data"]["invoice"];
    // (10 MW x 100 + 999) per year, billed for one quarter.
    assert_eq!(invoice["annual_total"], 1999.0);
    assert_eq!(invoice["total_price"], 499.75);
}

#[test]
fn price_rejects_negative_mw_with_pricing_input_class() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_json(
        dir.path(),
        "contract.json",
        &json!({ "pricing_model": "per_mw_modules", "total_mw": -1.0, "currency": "EUR" }),
    );

    let result = price::run(&input);
    assert_eq!(result.exit_code, 4);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "pricing_input");
}

#[test]
fn price_reports_missing_input_file() {
    let dir = TempDir::new().expect("temp dir");
    let result = price::run(&dir.path().join("absent.json"));
    assert_eq!(result.exit_code, 3);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "input");
    assert!(
        payload["message"].as_str().unwrap_or_default().contains("absent.json"),
        "message should name the missing file"
    );
}

#[test]
fn tiers_accepts_contiguous_named_set() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_json(
        dir.path(),
        "tiers.json",
        &json!({
            "name": "mw",
            "tiers": [
                { "minimum": 0.0, "maximum": 10.0, "rate": 100.0 },
                { "minimum": 10.0, "rate": 80.0 }
            ]
        }),
    );

    let result = tiers::run(&input);
    assert_eq!(result.exit_code, 0, "expected valid tier set: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["name"], "mw");
    assert_eq!(payload["data"]["tiers"], 2);
}

#[test]
fn tiers_reports_gap_as_domain_validation() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_json(
        dir.path(),
        "tiers.json",
        &json!([
            { "minimum": 0.0, "maximum": 10.0, "rate": 100.0 },
            { "minimum": 12.0, "rate": 80.0 }
        ]),
    );

    let result = tiers::run(&input);
    assert_eq!(result.exit_code, 4);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "domain_validation");
    assert_eq!(payload["data"]["issues"][0]["issue"], "gap");
}

#[test]
fn check_flags_spike_with_configured_thresholds() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(dir.path(), "history.json", &spike_history(1550.0));

        let config = AppConfig::load(LoadOptions::default()).expect("default config");
        let result = check::run(&config, &input);
        assert_eq!(result.exit_code, 0, "expected successful check: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "check");
        assert_eq!(payload["data"][0]["alert_type"], "invoice_increase");
        assert_eq!(payload["data"][0]["severity"], "critical");
    });
}

#[test]
fn check_respects_env_threshold_override() {
    with_env(&[("SOLBILL_ALERTS_INVOICE_INCREASE_CRITICAL", "0.9")], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(dir.path(), "history.json", &spike_history(1550.0));

        let config = AppConfig::load(LoadOptions::default()).expect("env config");
        let result = check::run(&config, &input);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"][0]["severity"], "warning");
    });
}

#[test]
fn check_returns_config_failure_for_invalid_thresholds() {
    with_env(&[("SOLBILL_ALERTS_INVOICE_INCREASE_WARNING", "lots")], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(dir.path(), "history.json", &spike_history(1550.0));

        let result = execute(parse_cli(&["check", "--input", path_arg(&input)]));
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "check");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn missing_config_file_fails_every_command_with_code_two() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let input = write_json(
            dir.path(),
            "contract.json",
            &json!({ "pricing_model": "per_site", "total_mw": 1.0, "currency": "EUR" }),
        );

        for command in ["price", "tiers"] {
            let cli = parse_cli(&[
                "--config",
                path_arg(&missing),
                command,
                "--input",
                path_arg(&input),
            ]);
            let result = execute(cli);
            assert_eq!(result.exit_code, 2, "{command} should fail on config: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], command);
            assert_eq!(payload["error_class"], "config_validation");
            assert!(payload["message"].as_str().unwrap_or_default().contains("absent.toml"));
        }

        let result = execute(parse_cli(&["--config", path_arg(&missing), "config"]));
        assert_eq!(result.exit_code, 2);
    });
}

#[test]
fn execute_runs_command_with_loaded_config() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let config_path = dir.path().join("solbill.toml");
        fs::write(&config_path, "[alerts]\ninvoice_increase_critical = 0.9\n")
            .expect("write config");
        let input = write_json(dir.path(), "history.json", &spike_history(1550.0));

        let cli = parse_cli(&[
            "--config",
            path_arg(&config_path),
            "check",
            "--input",
            path_arg(&input),
        ]);
        let result = execute(cli);
        assert_eq!(result.exit_code, 0, "expected successful check: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"][0]["severity"], "warning");
    });
}

#[test]
fn evaluate_prices_and_checks_in_one_pass() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_json(
            dir.path(),
            "evaluate.json",
            &json!({
                "computation": {
                    "pricing_model": "per_site",
                    "total_mw": 12.0,
                    "site_count": 4,
                    "currency": "EUR",
                    "base_monthly_price": 50.0
                },
                "context": {
                    "customer_id": "cust-1",
                    "contract_id": "contract-1",
                    "invoice_date": "2026-03-31",
                    "prior_invoices": [
                        prior_invoice("2026-01-31", 2400.0, Some(12.0)),
                        prior_invoice("2025-12-31", 2400.0, Some(12.0))
                    ]
                }
            }),
        );

        let config = AppConfig::load(LoadOptions::default()).expect("default config");
        let result = evaluate::run(&config, &input);
        assert_eq!(result.exit_code, 0, "expected successful evaluation: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["invoice"]["total_price"], 2400.0);
        assert_eq!(payload["data"]["alerts"], json!([]));
    });
}

#[test]
fn config_reports_file_and_env_sources() {
    with_env(&[("SOLBILL_LOG_LEVEL", "debug")], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("solbill.toml");
        fs::write(&path, "[alerts]\ninvoice_increase_warning = 0.2\n").expect("write config");

        let options =
            LoadOptions { config_path: Some(path), require_file: true, ..LoadOptions::default() };
        let loaded = AppConfig::load(options.clone()).expect("file config");
        let result = config::run(&options, &loaded);
        assert_eq!(result.exit_code, 0, "expected config output: {}", result.output);

        let payload = parse_payload(&result.output);
        let entries = payload["data"].as_array().expect("config entries");
        let source_of = |key: &str| {
            entries
                .iter()
                .find(|entry| entry["key"] == key)
                .and_then(|entry| entry["source"].as_str())
                .unwrap_or_default()
                .to_string()
        };

        assert!(source_of("alerts.invoice_increase_warning").starts_with("file ("));
        assert_eq!(source_of("logging.level"), "env (SOLBILL_LOG_LEVEL)");
        assert_eq!(source_of("currency.reference"), "default");
    });
}

fn spike_history(current_amount: f64) -> Value {
    json!({
        "invoice": {
            "customer_id": "cust-1",
            "contract_id": "contract-1",
            "invoice_date": "2026-03-31",
            "total_amount": current_amount,
            "currency": "EUR",
            "total_mw": 10.0,
            "site_count": 2
        },
        "prior_invoices": [
            prior_invoice("2026-02-28", 1000.0, Some(10.0)),
            prior_invoice("2026-01-31", 1050.0, Some(10.0)),
            prior_invoice("2025-12-31", 980.0, Some(10.0)),
            prior_invoice("2025-11-30", 1020.0, Some(10.0))
        ]
    })
}

fn prior_invoice(date: &str, amount: f64, total_mw: Option<f64>) -> Value {
    json!({
        "customer_id": "cust-1",
        "contract_id": "contract-1",
        "invoice_date": date,
        "total_amount": amount,
        "currency": "EUR",
        "total_mw": total_mw
    })
}

fn parse_cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("solbill").chain(args.iter().copied()))
        .expect("arguments should parse")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).expect("write input file");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SOLBILL_ALERTS_INVOICE_INCREASE_ENABLED",
        "SOLBILL_ALERTS_INVOICE_INCREASE_WARNING",
        "SOLBILL_ALERTS_INVOICE_INCREASE_CRITICAL",
        "SOLBILL_ALERTS_INVOICE_HISTORY_DEPTH",
        "SOLBILL_ALERTS_INVOICE_HISTORY_MINIMUM",
        "SOLBILL_ALERTS_MW_DECREASE_ENABLED",
        "SOLBILL_ALERTS_MW_DECREASE_THRESHOLD",
        "SOLBILL_ALERTS_SITE_DECREASE_ENABLED",
        "SOLBILL_ALERTS_SITE_DECREASE_THRESHOLD",
        "SOLBILL_ALERTS_ASSET_MANIPULATION_ENABLED",
        "SOLBILL_ALERTS_ASSET_MANIPULATION_WINDOW_DAYS",
        "SOLBILL_ALERTS_ASSET_MANIPULATION_THRESHOLD",
        "SOLBILL_CURRENCY_REFERENCE",
        "SOLBILL_LOGGING_LEVEL",
        "SOLBILL_LOGGING_FORMAT",
        "SOLBILL_LOG_LEVEL",
        "SOLBILL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
