use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::contract::{ContractId, CustomerId};

/// The invoice being checked, already priced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentInvoice {
    pub customer_id: CustomerId,
    pub contract_id: ContractId,
    pub invoice_date: NaiveDate,
    pub total_amount: f64,
    pub currency: String,
    pub total_mw: f64,
    pub site_count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalInvoice {
    pub customer_id: CustomerId,
    pub contract_id: ContractId,
    pub invoice_date: NaiveDate,
    pub total_amount: f64,
    pub currency: String,
    #[serde(default)]
    pub total_mw: Option<f64>,
}

/// One snapshot from the asset sync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetSyncRecord {
    pub synced_at: DateTime<Utc>,
    pub total_mw: f64,
    pub site_count: u32,
}
