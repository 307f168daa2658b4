//! Invoice anomaly detection.
//!
//! Each check is an independent, side-effect-free heuristic over the freshly
//! priced invoice and the history the caller fetched for it. Missing or thin
//! history never raises an alert on its own.

pub mod decrease;
pub mod manipulation;
pub mod settings;
pub mod spike;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::currency::ReferenceRates;
use crate::domain::{
    alert::InvoiceAlert,
    history::{AssetSyncRecord, CurrentInvoice, HistoricalInvoice},
};

pub use self::decrease::{MwDecreaseCheck, SiteCountDecreaseCheck};
pub use self::manipulation::{detect_asset_manipulation, AssetManipulationCheck};
pub use self::settings::{AlertSettings, AlertSettingsError, MAX_MANIPULATION_WINDOW_DAYS};
pub use self::spike::InvoiceSpikeCheck;

/// Everything one anomaly run looks at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyInput {
    pub invoice: CurrentInvoice,
    #[serde(default)]
    pub prior_invoices: Vec<HistoricalInvoice>,
    #[serde(default)]
    pub sync_history: Vec<AssetSyncRecord>,
    #[serde(default)]
    pub rates: ReferenceRates,
}

pub trait AnomalyCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn enabled(&self, settings: &AlertSettings) -> bool;

    fn evaluate(&self, input: &AnomalyInput, settings: &AlertSettings) -> Vec<InvoiceAlert>;
}

pub fn standard_checks() -> Vec<Box<dyn AnomalyCheck>> {
    vec![
        Box::new(InvoiceSpikeCheck),
        Box::new(MwDecreaseCheck),
        Box::new(SiteCountDecreaseCheck),
        Box::new(AssetManipulationCheck),
    ]
}

pub fn run_all_anomaly_checks(input: &AnomalyInput, settings: &AlertSettings) -> Vec<InvoiceAlert> {
    run_checks(&standard_checks(), input, settings)
}

/// Runs the enabled checks and returns their alerts, most severe first.
pub fn run_checks(
    checks: &[Box<dyn AnomalyCheck>],
    input: &AnomalyInput,
    settings: &AlertSettings,
) -> Vec<InvoiceAlert> {
    let mut alerts = Vec::new();

    for check in checks {
        if !check.enabled(settings) {
            debug!(event_name = "anomaly.check.disabled", check = check.name(), "check disabled");
            continue;
        }

        let found = check.evaluate(input, settings);
        for alert in &found {
            info!(
                event_name = "anomaly.check.triggered",
                check = check.name(),
                alert_type = alert.alert_type.as_str(),
                severity = ?alert.severity,
                customer_id = %input.invoice.customer_id.0,
                contract_id = %input.invoice.contract_id.0,
                "anomaly check raised an alert"
            );
        }
        alerts.extend(found);
    }

    alerts.sort_by(|left, right| right.severity.cmp(&left.severity));
    alerts
}
