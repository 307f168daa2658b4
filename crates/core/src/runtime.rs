use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::anomaly::{run_checks, standard_checks, AlertSettings, AnomalyCheck, AnomalyInput};
use crate::currency::ReferenceRates;
use crate::domain::{
    alert::InvoiceAlert,
    contract::{ContractId, CustomerId, InvoiceComputationInput},
    history::{AssetSyncRecord, CurrentInvoice, HistoricalInvoice},
    invoice::InvoiceResult,
};
use crate::errors::PricingError;
use crate::pricing::engine::{DeterministicInvoiceCalculator, InvoiceCalculator};

/// History the caller fetched for the invoice being priced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceContext {
    pub customer_id: CustomerId,
    pub contract_id: ContractId,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub prior_invoices: Vec<HistoricalInvoice>,
    #[serde(default)]
    pub sync_history: Vec<AssetSyncRecord>,
    #[serde(default)]
    pub rates: ReferenceRates,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingEvaluation {
    pub invoice: InvoiceResult,
    pub alerts: Vec<InvoiceAlert>,
}

/// Prices an invoice, then checks it against history.
pub struct BillingRuntime<C> {
    calculator: C,
    checks: Vec<Box<dyn AnomalyCheck>>,
}

impl<C> BillingRuntime<C> {
    pub fn new(calculator: C, checks: Vec<Box<dyn AnomalyCheck>>) -> Self {
        Self { calculator, checks }
    }
}

impl Default for BillingRuntime<DeterministicInvoiceCalculator> {
    fn default() -> Self {
        Self::new(DeterministicInvoiceCalculator, standard_checks())
    }
}

impl<C> BillingRuntime<C>
where
    C: InvoiceCalculator,
{
    pub fn evaluate(
        &self,
        input: &InvoiceComputationInput,
        context: InvoiceContext,
        settings: &AlertSettings,
    ) -> Result<BillingEvaluation, PricingError> {
        let invoice = self.calculator.calculate(input)?;

        let site_count = match input.assets.as_deref() {
            Some(assets) => u32::try_from(assets.len()).unwrap_or(u32::MAX),
            None => input.site_count.unwrap_or_default(),
        };
        let anomaly_input = AnomalyInput {
            invoice: CurrentInvoice {
                customer_id: context.customer_id,
                contract_id: context.contract_id,
                invoice_date: context.invoice_date,
                total_amount: invoice.total_price,
                currency: invoice.currency.clone(),
                total_mw: input.total_mw,
                site_count,
            },
            prior_invoices: context.prior_invoices,
            sync_history: context.sync_history,
            rates: context.rates,
        };
        let alerts = run_checks(&self.checks, &anomaly_input, settings);

        Ok(BillingEvaluation { invoice, alerts })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::anomaly::AlertSettings;
    use crate::currency::ReferenceRates;
    use crate::domain::{
        alert::{AlertSeverity, AlertType},
        catalog::{CatalogItem, CatalogItemId, CatalogPricing, CatalogSelection},
        contract::{ContractId, CustomerId, InvoiceComputationInput, PricingModel},
        history::HistoricalInvoice,
        invoice::InvoiceResult,
    };
    use crate::errors::PricingError;
    use crate::pricing::engine::InvoiceCalculator;

    use super::{BillingRuntime, InvoiceContext};

    fn invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 30).expect("valid date")
    }

    fn contract_input(total_mw: f64) -> InvoiceComputationInput {
        let mut input = InvoiceComputationInput::new(PricingModel::PerMwModules, total_mw, "EUR");
        input.modules = vec![CatalogSelection::new(CatalogItem {
            id: CatalogItemId("monitoring".to_string()),
            name: "Monitoring".to_string(),
            pricing: CatalogPricing::fixed(100.0),
        })];
        input
    }

    fn context(prior_totals: &[f64]) -> InvoiceContext {
        InvoiceContext {
            customer_id: CustomerId("cust-9".to_string()),
            contract_id: ContractId("contract-9".to_string()),
            invoice_date: invoice_date(),
            prior_invoices: prior_totals
                .iter()
                .enumerate()
                .map(|(index, total)| HistoricalInvoice {
                    customer_id: CustomerId("cust-9".to_string()),
                    contract_id: ContractId("contract-9".to_string()),
                    invoice_date: invoice_date() - Duration::days(90 * (index as i64 + 1)),
                    total_amount: *total,
                    currency: "EUR".to_string(),
                    total_mw: Some(10.0),
                })
                .collect(),
            sync_history: Vec::new(),
            rates: ReferenceRates::new("EUR"),
        }
    }

    #[test]
    fn default_runtime_prices_and_checks() {
        let runtime = BillingRuntime::default();

        let evaluation = runtime
            .evaluate(&contract_input(16.0), context(&[1000.0, 1000.0]), &AlertSettings::default())
            .expect("evaluation");

        assert_eq!(evaluation.invoice.total_price, 1600.0);
        assert_eq!(evaluation.alerts.len(), 1);
        assert_eq!(evaluation.alerts[0].alert_type, AlertType::InvoiceIncrease);
        assert_eq!(evaluation.alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn quiet_history_produces_no_alerts() {
        let runtime = BillingRuntime::default();

        let evaluation = runtime
            .evaluate(&contract_input(10.0), context(&[1000.0, 1000.0]), &AlertSettings::default())
            .expect("evaluation");

        assert!(evaluation.alerts.is_empty());
    }

    #[test]
    fn pricing_errors_propagate_before_checks_run() {
        struct FailingCalculator;

        impl InvoiceCalculator for FailingCalculator {
            fn calculate(
                &self,
                _input: &InvoiceComputationInput,
            ) -> Result<InvoiceResult, PricingError> {
                Err(PricingError::MissingCurrency)
            }
        }

        let runtime = BillingRuntime::new(FailingCalculator, crate::anomaly::standard_checks());
        let error = runtime
            .evaluate(&contract_input(10.0), context(&[]), &AlertSettings::default())
            .expect_err("calculator failure");
        assert_eq!(error, PricingError::MissingCurrency);
    }
}
