use serde::{Deserialize, Serialize};

use crate::domain::{
    asset::{AssetBillingItem, AssetDiscount},
    catalog::{AddonSelection, ModuleSelection},
    tier::Tier,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    PerMwModules,
    HybridTiered,
    GraduatedMwTiers,
    Capped,
    PerSite,
    Poc,
    QuantityTiers,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerMwModules => "per_mw_modules",
            Self::HybridTiered => "hybrid_tiered",
            Self::GraduatedMwTiers => "graduated_mw_tiers",
            Self::Capped => "capped",
            Self::PerSite => "per_site",
            Self::Poc => "poc",
            Self::QuantityTiers => "quantity_tiers",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    Monthly,
    Quarterly,
    Biannual,
    #[default]
    Annual,
}

impl BillingFrequency {
    /// Fraction of a year covered by one invoice period.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Monthly => 1.0 / 12.0,
            Self::Quarterly => 0.25,
            Self::Biannual => 0.5,
            Self::Annual => 1.0,
        }
    }
}

/// Annual floor applied after the portfolio discount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MinimumCharge {
    Flat { amount: f64 },
    /// Per-site minimum chosen by flat lookup on the billable site count.
    PerSiteTiers { tiers: Vec<Tier> },
}

/// Everything the engine needs to price one invoice period.
///
/// Catalog and tier rates are annual figures; `base_monthly_price` is the only
/// monthly amount and is annualized before flooring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceComputationInput {
    pub pricing_model: PricingModel,
    pub total_mw: f64,
    #[serde(default)]
    pub site_count: Option<u32>,
    pub currency: String,
    #[serde(default)]
    pub modules: Vec<ModuleSelection>,
    #[serde(default)]
    pub addons: Vec<AddonSelection>,
    #[serde(default)]
    pub mw_tiers: Vec<Tier>,
    #[serde(default)]
    pub hybrid_tiers: Vec<Tier>,
    #[serde(default)]
    pub quantity_tiers: Vec<Tier>,
    /// Tier rate is a percentage (10.0 = 10 %).
    #[serde(default)]
    pub discount_tiers: Vec<Tier>,
    #[serde(default)]
    pub minimum_charge: Option<MinimumCharge>,
    #[serde(default)]
    pub minimum_annual_value: Option<f64>,
    #[serde(default)]
    pub frequency: BillingFrequency,
    #[serde(default)]
    pub assets: Option<Vec<AssetBillingItem>>,
    #[serde(default)]
    pub asset_discounts: Vec<AssetDiscount>,
    #[serde(default)]
    pub base_monthly_price: Option<f64>,
    /// Enables per-asset pricing for module-priced models.
    #[serde(default)]
    pub site_minimum_annual: Option<f64>,
    #[serde(default)]
    pub onboarding_fee_per_site: Option<f64>,
    #[serde(default)]
    pub annual_renewal_fee_per_site: Option<f64>,
}

impl InvoiceComputationInput {
    pub fn new(pricing_model: PricingModel, total_mw: f64, currency: impl Into<String>) -> Self {
        Self {
            pricing_model,
            total_mw,
            site_count: None,
            currency: currency.into(),
            modules: Vec::new(),
            addons: Vec::new(),
            mw_tiers: Vec::new(),
            hybrid_tiers: Vec::new(),
            quantity_tiers: Vec::new(),
            discount_tiers: Vec::new(),
            minimum_charge: None,
            minimum_annual_value: None,
            frequency: BillingFrequency::Annual,
            assets: None,
            asset_discounts: Vec::new(),
            base_monthly_price: None,
            site_minimum_annual: None,
            onboarding_fee_per_site: None,
            annual_renewal_fee_per_site: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BillingFrequency, InvoiceComputationInput, MinimumCharge, PricingModel};

    #[test]
    fn frequency_multipliers_cover_one_year() {
        assert!((BillingFrequency::Monthly.multiplier() * 12.0 - 1.0).abs() < 1e-12);
        assert_eq!(BillingFrequency::Quarterly.multiplier() * 4.0, 1.0);
        assert_eq!(BillingFrequency::Biannual.multiplier() * 2.0, 1.0);
        assert_eq!(BillingFrequency::Annual.multiplier(), 1.0);
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let raw = r#"{
            "pricing_model": "graduated_mw_tiers",
            "total_mw": 25.0,
            "currency": "EUR",
            "minimum_charge": { "kind": "flat", "amount": 500.0 }
        }"#;

        let input: InvoiceComputationInput = serde_json::from_str(raw).expect("valid input");
        assert_eq!(input.pricing_model, PricingModel::GraduatedMwTiers);
        assert_eq!(input.frequency, BillingFrequency::Annual);
        assert!(input.modules.is_empty());
        assert_eq!(input.minimum_charge, Some(MinimumCharge::Flat { amount: 500.0 }));
    }
}
