//! Tier resolution.
//!
//! Two modes share one tier shape:
//! - flat lookup picks the single tier whose `[minimum, maximum)` interval
//!   contains the quantity (discount tiers, per-site minimum tiers);
//! - graduated accumulation bills each slice of the quantity at the rate of
//!   the tier it falls into, like tax brackets (MW tiers).
//!
//! Malformed tier sets are not repaired here. [`validate_tier_set`] reports
//! problems for the contract editor; the resolvers compute with whatever the
//! data says.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::tier::Tier;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierCharge {
    pub tier: Tier,
    pub quantity_in_tier: f64,
    pub cost: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraduatedCharge {
    pub per_tier: Vec<TierCharge>,
    pub total: f64,
}

impl GraduatedCharge {
    pub fn billed_quantity(&self) -> f64 {
        self.per_tier.iter().map(|charge| charge.quantity_in_tier).sum()
    }

    /// Highest tier that absorbed any quantity.
    pub fn top_tier(&self) -> Option<&Tier> {
        self.per_tier.last().map(|charge| &charge.tier)
    }
}

fn sorted_by_minimum(tiers: &[Tier]) -> Vec<&Tier> {
    let mut sorted: Vec<&Tier> = tiers.iter().collect();
    sorted.sort_by(|left, right| {
        left.minimum.partial_cmp(&right.minimum).unwrap_or(Ordering::Equal)
    });
    sorted
}

/// First tier (by ascending minimum) whose interval contains `quantity`.
///
/// `None` means no tier applies; callers treat that as "nothing to charge or
/// discount", not as an error.
pub fn resolve_tier(tiers: &[Tier], quantity: f64) -> Option<&Tier> {
    sorted_by_minimum(tiers).into_iter().find(|tier| tier.contains(quantity))
}

/// Progressive accumulation: the first N units at rate A, the next M at rate B.
///
/// Costs are summed unrounded. Degenerate tiers absorb nothing and do not
/// appear in the result.
pub fn resolve_graduated(tiers: &[Tier], quantity: f64) -> GraduatedCharge {
    let mut charge = GraduatedCharge::default();
    let mut remaining = quantity;

    for tier in sorted_by_minimum(tiers) {
        if remaining <= 0.0 {
            break;
        }

        let capacity = tier.capacity();
        if capacity <= 0.0 {
            continue;
        }

        let quantity_in_tier = remaining.min(capacity);
        let cost = quantity_in_tier * tier.rate;
        charge.total += cost;
        charge.per_tier.push(TierCharge { tier: tier.clone(), quantity_in_tier, cost });
        remaining -= quantity_in_tier;
    }

    charge
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TierIssue {
    Empty,
    DoesNotStartAtZero { minimum: f64 },
    Gap { after: String, before: String, from: f64, to: f64 },
    Overlap { first: String, second: String, from: f64, to: f64 },
    Degenerate { label: String },
    BoundedLastTier { label: String, maximum: f64 },
    NegativeRate { label: String, rate: f64 },
}

impl std::fmt::Display for TierIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "tier set is empty"),
            Self::DoesNotStartAtZero { minimum } => {
                write!(f, "lowest tier starts at {minimum}, expected 0")
            }
            Self::Gap { after, before, from, to } => {
                write!(f, "gap between `{after}` and `{before}` ({from}..{to})")
            }
            Self::Overlap { first, second, from, to } => {
                write!(f, "`{first}` overlaps `{second}` ({from}..{to})")
            }
            Self::Degenerate { label } => write!(f, "tier `{label}` has no capacity"),
            Self::BoundedLastTier { label, maximum } => {
                write!(f, "last tier `{label}` stops at {maximum}, expected unbounded")
            }
            Self::NegativeRate { label, rate } => {
                write!(f, "tier `{label}` has negative rate {rate}")
            }
        }
    }
}

/// Checks that a tier set is non-overlapping and covers `[0, inf)`.
///
/// Intended for the contract editor at save time. Returns every issue found,
/// in ascending tier order.
pub fn validate_tier_set(tiers: &[Tier]) -> Vec<TierIssue> {
    let sorted = sorted_by_minimum(tiers);
    let Some(first) = sorted.first() else {
        return vec![TierIssue::Empty];
    };

    let mut issues = Vec::new();
    if first.minimum != 0.0 {
        issues.push(TierIssue::DoesNotStartAtZero { minimum: first.minimum });
    }

    for tier in &sorted {
        if tier.is_degenerate() {
            issues.push(TierIssue::Degenerate { label: tier.display_label() });
        }
        if tier.rate < 0.0 {
            issues.push(TierIssue::NegativeRate { label: tier.display_label(), rate: tier.rate });
        }
    }

    for pair in sorted.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let end = current.upper_bound();
        match end.partial_cmp(&next.minimum) {
            Some(Ordering::Less) => issues.push(TierIssue::Gap {
                after: current.display_label(),
                before: next.display_label(),
                from: end,
                to: next.minimum,
            }),
            Some(Ordering::Greater) => issues.push(TierIssue::Overlap {
                first: current.display_label(),
                second: next.display_label(),
                from: next.minimum,
                to: end.min(next.upper_bound()),
            }),
            _ => {}
        }
    }

    if let Some(last) = sorted.last() {
        if let Some(maximum) = last.maximum {
            issues.push(TierIssue::BoundedLastTier { label: last.display_label(), maximum });
        }
    }

    issues
}
