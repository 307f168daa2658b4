pub mod catalog;
pub mod engine;
pub mod tiers;

pub use self::catalog::{price_of, resolve_price_source, PriceSource};
pub use self::engine::{
    calculate_invoice, enforce_minimum_annual_value, DeterministicInvoiceCalculator,
    InvoiceCalculator,
};
pub use self::tiers::{
    resolve_graduated, resolve_tier, validate_tier_set, GraduatedCharge, TierCharge, TierIssue,
};
