//! Catalog price resolution for modules and add-ons.
//!
//! Precedence is fixed: a custom price always wins, then a complexity price
//! when the item supports it and a level was chosen, then the flat price.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{CatalogPricing, CatalogSelection, Complexity};

/// Where a resolved unit price came from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceSource {
    Custom { price: f64 },
    Complexity { level: Complexity, price: f64 },
    Fixed { price: f64 },
}

impl PriceSource {
    pub fn unit_price(&self) -> f64 {
        match self {
            Self::Custom { price } | Self::Complexity { price, .. } | Self::Fixed { price } => {
                *price
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Custom { .. } => "custom price".to_string(),
            Self::Complexity { level, .. } => format!("{} complexity", level.as_str()),
            Self::Fixed { .. } => "catalog price".to_string(),
        }
    }
}

pub fn resolve_price_source(
    pricing: &CatalogPricing,
    complexity: Option<Complexity>,
    custom_price: Option<f64>,
) -> PriceSource {
    if let Some(price) = custom_price {
        return PriceSource::Custom { price };
    }

    if let (true, Some(level)) = (pricing.supports_complexity(), complexity) {
        return PriceSource::Complexity {
            level,
            price: pricing.complexity_price(level).unwrap_or(0.0),
        };
    }

    PriceSource::Fixed { price: pricing.flat_price().unwrap_or(0.0) }
}

/// Unit price times `quantity` when one is given.
pub fn price_of(
    pricing: &CatalogPricing,
    complexity: Option<Complexity>,
    custom_price: Option<f64>,
    quantity: Option<f64>,
) -> f64 {
    let unit_price = resolve_price_source(pricing, complexity, custom_price).unit_price();
    match quantity {
        Some(quantity) => unit_price * quantity,
        None => unit_price,
    }
}

impl CatalogSelection {
    pub fn price_source(&self) -> PriceSource {
        resolve_price_source(&self.definition.pricing, self.complexity, self.custom_price)
    }

    pub fn price(&self) -> f64 {
        price_of(&self.definition.pricing, self.complexity, self.custom_price, self.quantity)
    }
}
