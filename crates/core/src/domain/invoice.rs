use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Absolute tolerance used when re-deriving a total from its breakdown.
pub const BREAKDOWN_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCategory {
    Recurring,
    NonRecurring,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub amount: f64,
    pub category: LineCategory,
}

impl LineItem {
    pub fn recurring(label: impl Into<String>, amount: f64) -> Self {
        Self { label: label.into(), amount, category: LineCategory::Recurring }
    }

    pub fn non_recurring(label: impl Into<String>, amount: f64) -> Self {
        Self { label: label.into(), amount, category: LineCategory::NonRecurring }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceResult {
    pub total_price: f64,
    pub currency: String,
    pub breakdown: Vec<LineItem>,
    #[serde(default)]
    pub applied_tier: Option<String>,
    #[serde(default)]
    pub applied_discount_percent: Option<f64>,
    /// Recurring amount for a full year after all floors.
    pub annual_total: f64,
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("breakdown sums to {breakdown_sum} but total is {total_price} (tolerance {tolerance})")]
pub struct BreakdownMismatch {
    pub breakdown_sum: f64,
    pub total_price: f64,
    pub tolerance: f64,
}

impl InvoiceResult {
    pub fn breakdown_sum(&self) -> f64 {
        self.breakdown.iter().map(|line| line.amount).sum()
    }

    pub fn verify_breakdown(&self, tolerance: f64) -> Result<(), BreakdownMismatch> {
        let breakdown_sum = self.breakdown_sum();
        if (breakdown_sum - self.total_price).abs() <= tolerance {
            return Ok(());
        }
        Err(BreakdownMismatch { breakdown_sum, total_price: self.total_price, tolerance })
    }

    pub fn recurring_total(&self) -> f64 {
        self.sum_category(LineCategory::Recurring)
    }

    pub fn non_recurring_total(&self) -> f64 {
        self.sum_category(LineCategory::NonRecurring)
    }

    /// Total rounded to cents for display. Computation never rounds.
    pub fn presented_total(&self) -> Decimal {
        present_amount(self.total_price)
    }

    fn sum_category(&self, category: LineCategory) -> f64 {
        self.breakdown.iter().filter(|line| line.category == category).map(|line| line.amount).sum()
    }
}

/// Two decimal places, half away from zero. Always carries scale 2.
/// Amounts a `Decimal` cannot hold (NaN, infinities, beyond ~7.9e28) present
/// as zero and emit a warning.
pub fn present_amount(amount: f64) -> Decimal {
    let exact = Decimal::from_f64(amount).unwrap_or_else(|| {
        warn!(
            event_name = "invoice.presentation.out_of_range",
            amount,
            "amount cannot be represented as a decimal; presenting zero"
        );
        Decimal::ZERO
    });
    let mut presented = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    presented.rescale(2);
    presented
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{InvoiceResult, LineItem, BREAKDOWN_TOLERANCE};

    fn result(lines: Vec<LineItem>, total_price: f64) -> InvoiceResult {
        InvoiceResult {
            total_price,
            currency: "EUR".to_string(),
            breakdown: lines,
            applied_tier: None,
            applied_discount_percent: None,
            annual_total: total_price,
        }
    }

    #[test]
    fn verify_breakdown_accepts_matching_sum() {
        let invoice = result(
            vec![
                LineItem::recurring("Monitoring", 1000.0),
                LineItem::non_recurring("Onboarding", 250.5),
            ],
            1250.5,
        );
        assert!(invoice.verify_breakdown(BREAKDOWN_TOLERANCE).is_ok());
        assert_eq!(invoice.recurring_total(), 1000.0);
        assert_eq!(invoice.non_recurring_total(), 250.5);
    }

    #[test]
    fn verify_breakdown_reports_mismatch() {
        let invoice = result(vec![LineItem::recurring("Monitoring", 1000.0)], 1001.0);
        let error = invoice.verify_breakdown(BREAKDOWN_TOLERANCE).expect_err("mismatch");
        assert_eq!(error.breakdown_sum, 1000.0);
        assert!(error.to_string().contains("1001"));
    }

    #[test]
    fn presented_total_rounds_half_away_from_zero() {
        let invoice = result(vec![LineItem::recurring("Monitoring", 1200.125)], 1200.125);
        assert_eq!(invoice.presented_total(), Decimal::new(120013, 2));
    }

    #[test]
    fn whole_amounts_present_with_two_decimals() {
        assert_eq!(super::present_amount(2200.0).to_string(), "2200.00");
    }

    #[test]
    fn unrepresentable_amounts_present_as_zero() {
        for amount in [f64::NAN, f64::INFINITY, f64::MAX] {
            let presented = super::present_amount(amount);
            assert_eq!(presented, Decimal::ZERO);
            assert_eq!(presented.to_string(), "0.00");
        }
    }
}
