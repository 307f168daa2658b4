use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub String);

/// One monitored site as reported by the asset sync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetBillingItem {
    pub asset_id: AssetId,
    pub asset_name: String,
    pub total_mw: f64,
    #[serde(default)]
    pub is_hybrid: bool,
    #[serde(default)]
    pub onboarding_date: Option<NaiveDate>,
    #[serde(default)]
    pub needs_onboarding: bool,
    #[serde(default)]
    pub needs_annual_renewal: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPricingType {
    Annual,
    PerMw,
}

/// Negotiated per-asset price. An asset with an override is billed only here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetDiscount {
    pub asset_id: AssetId,
    pub pricing_type: AssetPricingType,
    pub price: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl AssetDiscount {
    pub fn annual_charge(&self, asset: &AssetBillingItem) -> f64 {
        match self.pricing_type {
            AssetPricingType::Annual => self.price,
            AssetPricingType::PerMw => self.price * asset.total_mw,
        }
    }
}
