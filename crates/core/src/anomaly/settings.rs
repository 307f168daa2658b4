use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Thresholds for the invoice anomaly checks.
///
/// Every field has a default, so a partial settings document (or none at
/// all) still yields a usable configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub invoice_increase_enabled: bool,
    /// Increase ratio over the prior mean that raises a warning (0.30 = 30 %).
    pub invoice_increase_warning: f64,
    /// Increase ratio over the prior mean that raises a critical alert.
    pub invoice_increase_critical: f64,
    /// How many prior invoices feed the mean.
    pub invoice_history_depth: usize,
    /// Fewer priors than this and the spike check stays silent.
    pub invoice_history_minimum: usize,

    pub mw_decrease_enabled: bool,
    /// A decrease must exceed this many MW to alert. 0 alerts on any decrease.
    pub mw_decrease_threshold: f64,

    pub site_decrease_enabled: bool,
    /// A decrease must exceed this many sites to alert. 0 alerts on any decrease.
    pub site_decrease_threshold: u32,

    pub asset_manipulation_enabled: bool,
    /// Half-width of the window around the invoice date.
    pub asset_manipulation_window_days: i64,
    /// Relative MW change that counts as removal or return (0.05 = 5 %).
    pub asset_manipulation_threshold: f64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            invoice_increase_enabled: true,
            invoice_increase_warning: 0.30,
            invoice_increase_critical: 0.50,
            invoice_history_depth: 4,
            invoice_history_minimum: 2,
            mw_decrease_enabled: true,
            mw_decrease_threshold: 0.0,
            site_decrease_enabled: true,
            site_decrease_threshold: 0,
            asset_manipulation_enabled: true,
            asset_manipulation_window_days: 30,
            asset_manipulation_threshold: 0.05,
        }
    }
}

/// Widest manipulation window accepted, in days on each side of the invoice.
pub const MAX_MANIPULATION_WINDOW_DAYS: i64 = 3650;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("alerts.{field} {requirement}")]
pub struct AlertSettingsError {
    pub field: &'static str,
    pub requirement: &'static str,
}

impl AlertSettingsError {
    fn new(field: &'static str, requirement: &'static str) -> Self {
        Self { field, requirement }
    }
}

impl AlertSettings {
    /// Returns the first problem found, phrased for an operator.
    pub fn validate(&self) -> Result<(), AlertSettingsError> {
        if !(self.invoice_increase_warning.is_finite() && self.invoice_increase_warning >= 0.0) {
            return Err(AlertSettingsError::new(
                "invoice_increase_warning",
                "must be a non-negative number",
            ));
        }
        if !(self.invoice_increase_critical.is_finite()
            && self.invoice_increase_critical >= self.invoice_increase_warning)
        {
            return Err(AlertSettingsError::new(
                "invoice_increase_critical",
                "must be at least alerts.invoice_increase_warning",
            ));
        }
        if self.invoice_history_depth == 0 {
            return Err(AlertSettingsError::new(
                "invoice_history_depth",
                "must be greater than zero",
            ));
        }
        if self.invoice_history_minimum == 0
            || self.invoice_history_minimum > self.invoice_history_depth
        {
            return Err(AlertSettingsError::new(
                "invoice_history_minimum",
                "must be in range 1..=invoice_history_depth",
            ));
        }
        if !(self.mw_decrease_threshold.is_finite() && self.mw_decrease_threshold >= 0.0) {
            return Err(AlertSettingsError::new(
                "mw_decrease_threshold",
                "must be a non-negative number",
            ));
        }
        if !(1..=MAX_MANIPULATION_WINDOW_DAYS).contains(&self.asset_manipulation_window_days) {
            return Err(AlertSettingsError::new(
                "asset_manipulation_window_days",
                "must be in range 1..=3650",
            ));
        }
        if !(self.asset_manipulation_threshold > 0.0 && self.asset_manipulation_threshold < 1.0) {
            return Err(AlertSettingsError::new(
                "asset_manipulation_threshold",
                "must be in range (0, 1)",
            ));
        }
        Ok(())
    }
}
