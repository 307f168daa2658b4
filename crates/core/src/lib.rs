pub mod anomaly;
pub mod config;
pub mod currency;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod runtime;

pub use anomaly::{run_all_anomaly_checks, AlertSettings, AnomalyCheck, AnomalyInput};
pub use currency::{convert_result, ExchangeRate, ReferenceRates};
pub use domain::alert::{AlertSeverity, AlertType, InvoiceAlert};
pub use domain::contract::{BillingFrequency, InvoiceComputationInput, PricingModel};
pub use domain::invoice::{InvoiceResult, LineItem};
pub use domain::tier::Tier;
pub use errors::{ApplicationError, DomainError, InterfaceError, PricingError};
pub use pricing::{calculate_invoice, resolve_graduated, resolve_tier, InvoiceCalculator};
pub use runtime::{BillingEvaluation, BillingRuntime, InvoiceContext};
