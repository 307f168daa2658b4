use serde_json::json;
use tracing::warn;

use super::{AlertSettings, AnomalyCheck, AnomalyInput};
use crate::domain::alert::{AlertSeverity, AlertType, InvoiceAlert};

/// Flags an invoice total well above the customer's recent average.
#[derive(Clone, Copy, Debug, Default)]
pub struct InvoiceSpikeCheck;

impl AnomalyCheck for InvoiceSpikeCheck {
    fn name(&self) -> &'static str {
        "invoice_increase"
    }

    fn enabled(&self, settings: &AlertSettings) -> bool {
        settings.invoice_increase_enabled
    }

    fn evaluate(&self, input: &AnomalyInput, settings: &AlertSettings) -> Vec<InvoiceAlert> {
        detect_invoice_spike(input, settings).into_iter().collect()
    }
}

pub fn detect_invoice_spike(
    input: &AnomalyInput,
    settings: &AlertSettings,
) -> Option<InvoiceAlert> {
    let invoice = &input.invoice;
    let reference = &input.rates.reference;

    let mut priors: Vec<_> = input
        .prior_invoices
        .iter()
        .filter(|prior| {
            prior.customer_id == invoice.customer_id && prior.invoice_date < invoice.invoice_date
        })
        .collect();
    priors.sort_by(|left, right| right.invoice_date.cmp(&left.invoice_date));

    let prior_amounts: Vec<f64> = priors
        .into_iter()
        .take(settings.invoice_history_depth)
        .filter_map(|prior| {
            let normalized = input.rates.to_reference(prior.total_amount, &prior.currency);
            if normalized.is_none() {
                warn!(
                    event_name = "anomaly.invoice_increase.rate_missing",
                    currency = %prior.currency,
                    reference = %reference,
                    "prior invoice skipped; no exchange rate to the reference currency"
                );
            }
            normalized
        })
        .collect();

    if prior_amounts.len() < settings.invoice_history_minimum {
        return None;
    }

    let mean = prior_amounts.iter().sum::<f64>() / prior_amounts.len() as f64;
    if mean <= 0.0 || !mean.is_finite() {
        return None;
    }

    let current = input.rates.to_reference(invoice.total_amount, &invoice.currency)?;
    let increase_ratio = (current - mean) / mean;

    let severity = if increase_ratio >= settings.invoice_increase_critical {
        AlertSeverity::Critical
    } else if increase_ratio >= settings.invoice_increase_warning {
        AlertSeverity::Warning
    } else {
        return None;
    };

    let increase_percent = increase_ratio * 100.0;
    Some(InvoiceAlert {
        alert_type: AlertType::InvoiceIncrease,
        severity,
        title: format!("Invoice total up {increase_percent:.1}% on recent average"),
        description: format!(
            "Invoice total {current:.2} {reference} is {increase_percent:.1}% above the \
             average of the last {} invoices ({mean:.2} {reference}).",
            prior_amounts.len()
        ),
        metadata: json!({
            "current_amount": current,
            "reference_currency": reference,
            "prior_amounts": prior_amounts,
            "prior_count": prior_amounts.len(),
            "prior_mean": mean,
            "increase_ratio": increase_ratio,
            "increase_percent": increase_percent,
            "warning_threshold": settings.invoice_increase_warning,
            "critical_threshold": settings.invoice_increase_critical,
            "invoice_date": invoice.invoice_date.to_string(),
        }),
    })
}
