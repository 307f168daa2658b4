use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    InvoiceIncrease,
    MwDecrease,
    SiteCountDecrease,
    AssetsDisappeared,
    AssetsReappeared,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvoiceIncrease => "invoice_increase",
            Self::MwDecrease => "mw_decrease",
            Self::SiteCountDecrease => "site_count_decrease",
            Self::AssetsDisappeared => "assets_disappeared",
            Self::AssetsReappeared => "assets_reappeared",
        }
    }
}

/// A triggered billing heuristic awaiting human review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAlert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    /// Every number the check used, so a reviewer can audit it.
    pub metadata: serde_json::Value,
}
