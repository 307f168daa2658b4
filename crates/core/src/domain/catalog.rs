use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogItemId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// How a catalog module or add-on is priced before any human override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CatalogPricing {
    Fixed {
        #[serde(default)]
        price: Option<f64>,
    },
    /// Complexity-tiered item. `price` is used when no complexity was chosen.
    Complexity {
        #[serde(default)]
        price: Option<f64>,
        #[serde(default)]
        low: Option<f64>,
        #[serde(default)]
        medium: Option<f64>,
        #[serde(default)]
        high: Option<f64>,
    },
}

impl CatalogPricing {
    pub fn fixed(price: f64) -> Self {
        Self::Fixed { price: Some(price) }
    }

    pub fn complexity_price(&self, level: Complexity) -> Option<f64> {
        match self {
            Self::Fixed { .. } => None,
            Self::Complexity { low, medium, high, .. } => match level {
                Complexity::Low => *low,
                Complexity::Medium => *medium,
                Complexity::High => *high,
            },
        }
    }

    pub fn flat_price(&self) -> Option<f64> {
        match self {
            Self::Fixed { price } | Self::Complexity { price, .. } => *price,
        }
    }

    pub fn supports_complexity(&self) -> bool {
        matches!(self, Self::Complexity { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    pub pricing: CatalogPricing,
}

/// A module or add-on chosen on a contract, with any negotiated override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogSelection {
    pub definition: CatalogItem,
    #[serde(default)]
    pub complexity: Option<Complexity>,
    #[serde(default)]
    pub custom_price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
}

/// Modules are priced per MW per year.
pub type ModuleSelection = CatalogSelection;
/// Add-ons are priced per year, optionally per counted unit.
pub type AddonSelection = CatalogSelection;

impl CatalogSelection {
    pub fn new(definition: CatalogItem) -> Self {
        Self { definition, complexity: None, custom_price: None, quantity: None }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_custom_price(mut self, custom_price: f64) -> Self {
        self.custom_price = Some(custom_price);
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}
