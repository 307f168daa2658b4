//! Currency conversion around the engine.
//!
//! The engine prices in the contract's own currency. Converting a result for
//! display, or normalizing history for comparison, happens here with rates
//! supplied by the caller. Rates carry no timestamp.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::invoice::{InvoiceResult, LineItem};
use crate::errors::PricingError;

/// One scalar rate: `1 from = rate to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

impl ExchangeRate {
    pub fn new(from: impl Into<String>, to: impl Into<String>, rate: f64) -> Self {
        Self { from: from.into(), to: to.into(), rate }
    }
}

pub fn convert_result(
    result: &InvoiceResult,
    exchange: &ExchangeRate,
) -> Result<InvoiceResult, PricingError> {
    if !same_currency(&result.currency, &exchange.from) {
        return Err(PricingError::CurrencyMismatch {
            expected: exchange.from.clone(),
            actual: result.currency.clone(),
        });
    }
    if !(exchange.rate.is_finite() && exchange.rate > 0.0) {
        return Err(PricingError::InvalidExchangeRate {
            from: exchange.from.clone(),
            to: exchange.to.clone(),
            rate: exchange.rate,
        });
    }

    let breakdown = result
        .breakdown
        .iter()
        .map(|line| LineItem {
            label: line.label.clone(),
            amount: line.amount * exchange.rate,
            category: line.category,
        })
        .collect();

    Ok(InvoiceResult {
        total_price: result.total_price * exchange.rate,
        currency: exchange.to.clone(),
        breakdown,
        applied_tier: result.applied_tier.clone(),
        applied_discount_percent: result.applied_discount_percent,
        annual_total: result.annual_total * exchange.rate,
    })
}

/// Rates into a single reference currency, used to compare invoices issued
/// in different currencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRates {
    pub reference: String,
    /// `1 <key> = value <reference>`
    #[serde(default)]
    pub rates: BTreeMap<String, f64>,
}

impl Default for ReferenceRates {
    fn default() -> Self {
        Self::new("EUR")
    }
}

impl ReferenceRates {
    pub fn new(reference: impl Into<String>) -> Self {
        Self { reference: reference.into(), rates: BTreeMap::new() }
    }

    pub fn with_rate(mut self, currency: impl Into<String>, rate: f64) -> Self {
        self.rates.insert(currency.into().to_ascii_uppercase(), rate);
        self
    }

    /// `None` when no usable rate is known for `currency`.
    pub fn to_reference(&self, amount: f64, currency: &str) -> Option<f64> {
        if same_currency(currency, &self.reference) {
            return Some(amount);
        }
        self.rates
            .get(&currency.trim().to_ascii_uppercase())
            .filter(|rate| rate.is_finite() && **rate > 0.0)
            .map(|rate| amount * rate)
    }
}

fn same_currency(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
