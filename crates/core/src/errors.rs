use thiserror::Error;

use crate::domain::contract::PricingModel;

/// Defects in the data handed to the pricing engine. A wrong invoice total
/// costs money, so these fail fast instead of defaulting.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("`{field}` must be a finite, non-negative number (got {value})")]
    InvalidNumber { field: String, value: f64 },
    #[error("`{field}` is required for the {model:?} pricing model")]
    MissingField { field: &'static str, model: PricingModel },
    #[error("currency is required")]
    MissingCurrency,
    #[error("exchange rate from {from} to {to} must be positive (got {rate})")]
    InvalidExchangeRate { from: String, to: String, rate: f64 },
    #[error("cannot convert a {actual} invoice with a rate quoted from {expected}")]
    CurrencyMismatch { expected: String, actual: String },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("tier set `{name}` is malformed: {issues}")]
    InvalidTierSet { name: String, issues: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("input failure: {0}")]
    Input(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The billing data could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    /// Stable classifier for structured command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_validation",
            Self::Pricing(_) => "pricing_input",
            Self::Input(_) => "input",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Pricing(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Input(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::contract::PricingModel;
    use crate::errors::{ApplicationError, DomainError, InterfaceError, PricingError};

    #[test]
    fn pricing_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(PricingError::MissingField {
            field: "base_monthly_price",
            model: PricingModel::Capped,
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message.contains("base_monthly_price")
        ));
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "negative site count".to_owned(),
        ))
        .into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "The billing data could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let error = ApplicationError::Configuration("bad threshold".to_owned());
        assert_eq!(error.error_class(), "config_validation");

        let interface = error.into_interface("req-3");
        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn error_classes_are_stable() {
        let pricing = ApplicationError::from(PricingError::MissingCurrency);
        let domain = ApplicationError::from(DomainError::InvalidTierSet {
            name: "mw_tiers".to_owned(),
            issues: "gap".to_owned(),
        });

        assert_eq!(pricing.error_class(), "pricing_input");
        assert_eq!(domain.error_class(), "domain_validation");
        assert_eq!(ApplicationError::Input("x".to_owned()).error_class(), "input");
    }
}
