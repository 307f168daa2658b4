use serde_json::json;

use super::{AlertSettings, AnomalyCheck, AnomalyInput};
use crate::domain::alert::{AlertSeverity, AlertType, InvoiceAlert};

/// Billed MW dropped since the contract's previous invoice.
#[derive(Clone, Copy, Debug, Default)]
pub struct MwDecreaseCheck;

impl AnomalyCheck for MwDecreaseCheck {
    fn name(&self) -> &'static str {
        "mw_decrease"
    }

    fn enabled(&self, settings: &AlertSettings) -> bool {
        settings.mw_decrease_enabled
    }

    fn evaluate(&self, input: &AnomalyInput, settings: &AlertSettings) -> Vec<InvoiceAlert> {
        detect_mw_decrease(input, settings).into_iter().collect()
    }
}

/// Site count dropped since the previous asset sync.
#[derive(Clone, Copy, Debug, Default)]
pub struct SiteCountDecreaseCheck;

impl AnomalyCheck for SiteCountDecreaseCheck {
    fn name(&self) -> &'static str {
        "site_count_decrease"
    }

    fn enabled(&self, settings: &AlertSettings) -> bool {
        settings.site_decrease_enabled
    }

    fn evaluate(&self, input: &AnomalyInput, settings: &AlertSettings) -> Vec<InvoiceAlert> {
        detect_site_count_decrease(input, settings).into_iter().collect()
    }
}

pub fn detect_mw_decrease(input: &AnomalyInput, settings: &AlertSettings) -> Option<InvoiceAlert> {
    let invoice = &input.invoice;
    let previous = input
        .prior_invoices
        .iter()
        .filter(|prior| {
            prior.contract_id == invoice.contract_id && prior.invoice_date < invoice.invoice_date
        })
        .max_by_key(|prior| prior.invoice_date)?;
    let previous_mw = previous.total_mw?;

    let decrease = previous_mw - invoice.total_mw;
    if decrease <= 0.0 || decrease <= settings.mw_decrease_threshold {
        return None;
    }
    let decrease_percent = if previous_mw > 0.0 { decrease / previous_mw * 100.0 } else { 0.0 };

    Some(InvoiceAlert {
        alert_type: AlertType::MwDecrease,
        severity: AlertSeverity::Warning,
        title: format!("Billed capacity down {decrease:.2} MW"),
        description: format!(
            "Billed capacity fell from {previous_mw:.2} MW on the {} invoice to {:.2} MW \
             ({decrease_percent:.1}% decrease).",
            previous.invoice_date, invoice.total_mw
        ),
        metadata: json!({
            "previous_mw": previous_mw,
            "current_mw": invoice.total_mw,
            "decrease_mw": decrease,
            "decrease_percent": decrease_percent,
            "threshold_mw": settings.mw_decrease_threshold,
            "previous_invoice_date": previous.invoice_date.to_string(),
            "invoice_date": invoice.invoice_date.to_string(),
        }),
    })
}

/// Compares against the second-most-recent sync on or before the invoice date;
/// the most recent one is the snapshot this invoice was built from.
pub fn detect_site_count_decrease(
    input: &AnomalyInput,
    settings: &AlertSettings,
) -> Option<InvoiceAlert> {
    let invoice = &input.invoice;
    let mut history: Vec<_> = input
        .sync_history
        .iter()
        .filter(|sync| sync.synced_at.date_naive() <= invoice.invoice_date)
        .collect();
    history.sort_by(|left, right| right.synced_at.cmp(&left.synced_at));
    let previous = history.get(1)?;

    let decrease = i64::from(previous.site_count) - i64::from(invoice.site_count);
    if decrease <= 0 || decrease <= i64::from(settings.site_decrease_threshold) {
        return None;
    }
    let decrease_percent = if previous.site_count > 0 {
        decrease as f64 / f64::from(previous.site_count) * 100.0
    } else {
        0.0
    };

    Some(InvoiceAlert {
        alert_type: AlertType::SiteCountDecrease,
        severity: AlertSeverity::Warning,
        title: format!("{decrease} fewer sites than the previous sync"),
        description: format!(
            "Site count fell from {} at the {} sync to {} ({decrease_percent:.1}% decrease).",
            previous.site_count,
            previous.synced_at.to_rfc3339(),
            invoice.site_count
        ),
        metadata: json!({
            "previous_site_count": previous.site_count,
            "current_site_count": invoice.site_count,
            "decrease_sites": decrease,
            "decrease_percent": decrease_percent,
            "threshold_sites": settings.site_decrease_threshold,
            "previous_synced_at": previous.synced_at.to_rfc3339(),
        }),
    })
}
