use std::path::Path;

use serde::Deserialize;
use solbill_core::config::AppConfig;
use solbill_core::domain::contract::InvoiceComputationInput;
use solbill_core::errors::ApplicationError;
use solbill_core::pricing::DeterministicInvoiceCalculator;
use solbill_core::runtime::{BillingEvaluation, BillingRuntime, InvoiceContext};

use crate::commands::{read_input, CommandResult};

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    computation: InvoiceComputationInput,
    context: InvoiceContext,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    match evaluate(config, input) {
        Ok(evaluation) => {
            let message = format!(
                "invoice total {} {} with {} alert(s)",
                evaluation.invoice.presented_total(),
                evaluation.invoice.currency,
                evaluation.alerts.len()
            );
            CommandResult::success_with_data("evaluate", message, &evaluation)
        }
        Err(error) => CommandResult::from_error("evaluate", error),
    }
}

fn evaluate(config: &AppConfig, input: &Path) -> Result<BillingEvaluation, ApplicationError> {
    let request: EvaluateRequest = read_input(input)?;

    let runtime: BillingRuntime<DeterministicInvoiceCalculator> = BillingRuntime::default();
    let evaluation = runtime.evaluate(&request.computation, request.context, &config.alerts)?;
    Ok(evaluation)
}
