use std::path::Path;

use serde::Serialize;
use solbill_core::domain::contract::InvoiceComputationInput;
use solbill_core::domain::invoice::{InvoiceResult, BREAKDOWN_TOLERANCE};
use solbill_core::errors::{ApplicationError, DomainError};
use solbill_core::pricing::{DeterministicInvoiceCalculator, InvoiceCalculator};
use tracing::info;

use crate::commands::{read_input, CommandResult};

#[derive(Debug, Serialize)]
struct PriceReport {
    invoice: InvoiceResult,
    presented_total: String,
    recurring_total: f64,
    non_recurring_total: f64,
}

pub fn run(input: &Path) -> CommandResult {
    match price(input) {
        Ok(report) => {
            let message = format!(
                "invoice total {} {}",
                report.presented_total, report.invoice.currency
            );
            CommandResult::success_with_data("price", message, &report)
        }
        Err(error) => CommandResult::from_error("price", error),
    }
}

fn price(input: &Path) -> Result<PriceReport, ApplicationError> {
    let computation: InvoiceComputationInput = read_input(input)?;
    let invoice = DeterministicInvoiceCalculator.calculate(&computation)?;

    invoice
        .verify_breakdown(BREAKDOWN_TOLERANCE)
        .map_err(|mismatch| DomainError::InvariantViolation(mismatch.to_string()))?;

    info!(
        event_name = "cli.price.completed",
        model = computation.pricing_model.as_str(),
        total = invoice.total_price,
        lines = invoice.breakdown.len(),
        "priced invoice from input file"
    );

    Ok(PriceReport {
        presented_total: invoice.presented_total().to_string(),
        recurring_total: invoice.recurring_total(),
        non_recurring_total: invoice.non_recurring_total(),
        invoice,
    })
}
