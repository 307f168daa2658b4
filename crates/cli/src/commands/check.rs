use std::path::Path;

use serde::Deserialize;
use solbill_core::anomaly::{run_all_anomaly_checks, AnomalyInput};
use solbill_core::config::AppConfig;
use solbill_core::currency::ReferenceRates;
use solbill_core::domain::alert::InvoiceAlert;
use solbill_core::domain::history::{AssetSyncRecord, CurrentInvoice, HistoricalInvoice};
use solbill_core::errors::ApplicationError;

use crate::commands::{read_input, CommandResult};

/// Anomaly input as stored on disk; `rates` falls back to the configured
/// reference currency with no conversions.
#[derive(Debug, Deserialize)]
struct CheckRequest {
    invoice: CurrentInvoice,
    #[serde(default)]
    prior_invoices: Vec<HistoricalInvoice>,
    #[serde(default)]
    sync_history: Vec<AssetSyncRecord>,
    #[serde(default)]
    rates: Option<ReferenceRates>,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    match check(config, input) {
        Ok(alerts) => {
            let message = match alerts.len() {
                0 => "no anomalies detected".to_string(),
                1 => "1 anomaly detected".to_string(),
                count => format!("{count} anomalies detected"),
            };
            CommandResult::success_with_data("check", message, &alerts)
        }
        Err(error) => CommandResult::from_error("check", error),
    }
}

fn check(config: &AppConfig, input: &Path) -> Result<Vec<InvoiceAlert>, ApplicationError> {
    let request: CheckRequest = read_input(input)?;

    let anomaly_input = AnomalyInput {
        invoice: request.invoice,
        prior_invoices: request.prior_invoices,
        sync_history: request.sync_history,
        rates: request
            .rates
            .unwrap_or_else(|| ReferenceRates::new(config.currency.reference.clone())),
    };

    Ok(run_all_anomaly_checks(&anomaly_input, &config.alerts))
}
