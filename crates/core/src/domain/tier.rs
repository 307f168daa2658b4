use serde::{Deserialize, Serialize};

/// A contiguous numeric range with an associated rate.
///
/// `maximum = None` means the tier is unbounded above. The interval is
/// half-open: `[minimum, maximum)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub minimum: f64,
    #[serde(default)]
    pub maximum: Option<f64>,
    pub rate: f64,
    #[serde(default)]
    pub label: String,
}

impl Tier {
    pub fn new(minimum: f64, maximum: Option<f64>, rate: f64, label: impl Into<String>) -> Self {
        Self { minimum, maximum, rate, label: label.into() }
    }

    pub fn upper_bound(&self) -> f64 {
        self.maximum.unwrap_or(f64::INFINITY)
    }

    pub fn contains(&self, quantity: f64) -> bool {
        quantity >= self.minimum && quantity < self.upper_bound()
    }

    /// Units this tier can absorb during graduated accumulation.
    pub fn capacity(&self) -> f64 {
        (self.upper_bound() - self.minimum).max(0.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.maximum.is_some_and(|maximum| maximum <= self.minimum)
    }

    pub fn display_label(&self) -> String {
        if !self.label.trim().is_empty() {
            return self.label.clone();
        }
        match self.maximum {
            Some(maximum) => format!("{}-{}", self.minimum, maximum),
            None => format!("{}+", self.minimum),
        }
    }
}
