//! Invoice calculation.
//!
//! Composes the tier and catalog resolvers into one invoice total. All
//! recurring amounts are computed as annual figures, floored, and only then
//! scaled to the billing period. Non-recurring fees are added at face value
//! after scaling.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::domain::{
    asset::{AssetBillingItem, AssetDiscount, AssetId},
    contract::{InvoiceComputationInput, MinimumCharge, PricingModel},
    invoice::{InvoiceResult, LineItem},
};
use crate::errors::PricingError;
use crate::pricing::tiers::{resolve_graduated, resolve_tier};

pub trait InvoiceCalculator: Send + Sync {
    fn calculate(&self, input: &InvoiceComputationInput) -> Result<InvoiceResult, PricingError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicInvoiceCalculator;

impl InvoiceCalculator for DeterministicInvoiceCalculator {
    fn calculate(&self, input: &InvoiceComputationInput) -> Result<InvoiceResult, PricingError> {
        calculate_invoice(input)
    }
}

/// `max(annual, minimum)`; idempotent.
pub fn enforce_minimum_annual_value(annual: f64, minimum: Option<f64>) -> f64 {
    match minimum {
        Some(minimum) => annual.max(minimum),
        None => annual,
    }
}

pub fn calculate_invoice(input: &InvoiceComputationInput) -> Result<InvoiceResult, PricingError> {
    validate_input(input)?;

    let portfolio = Portfolio::from_input(input);
    let mut applied_tier = None;

    let mut recurring = base_component(input, &portfolio, &mut applied_tier)?;
    recurring.extend(input.addons.iter().map(|addon| {
        let label = match addon.quantity {
            Some(quantity) => format!(
                "{} ({}, x{quantity})",
                addon.definition.name,
                addon.price_source().describe()
            ),
            None => format!("{} ({})", addon.definition.name, addon.price_source().describe()),
        };
        LineItem::recurring(label, addon.price())
    }));

    let subtotal = sum_lines(&recurring);
    let applied_discount_percent = apply_portfolio_discount(input, subtotal, &mut recurring);

    for (asset, discount) in &portfolio.overridden {
        let label = match &discount.note {
            Some(note) => format!("Negotiated rate: {} ({note})", asset.asset_name),
            None => format!("Negotiated rate: {}", asset.asset_name),
        };
        recurring.push(LineItem::recurring(label, discount.annual_charge(asset)));
    }

    let mut annual = sum_lines(&recurring);

    if let Some(floor) = minimum_charge_floor(input, &portfolio)? {
        if floor > annual {
            debug!(
                event_name = "pricing.invoice.minimum_charge_applied",
                floor,
                annual,
                "minimum charge raised the subtotal"
            );
            recurring.push(LineItem::recurring("Minimum charge adjustment", floor - annual));
            annual = floor;
        }
    }

    let floored = enforce_minimum_annual_value(annual, input.minimum_annual_value);
    if floored > annual {
        debug!(
            event_name = "pricing.invoice.minimum_annual_value_applied",
            minimum_annual_value = floored,
            annual,
            "minimum annual value raised the subtotal"
        );
        recurring.push(LineItem::recurring("Minimum annual value adjustment", floored - annual));
        annual = floored;
    }

    let multiplier = input.frequency.multiplier();
    let mut breakdown: Vec<LineItem> = recurring
        .into_iter()
        .map(|line| LineItem { amount: line.amount * multiplier, ..line })
        .collect();
    breakdown.extend(non_recurring_lines(input));

    let total_price = sum_lines(&breakdown);

    info!(
        event_name = "pricing.invoice.calculated",
        pricing_model = input.pricing_model.as_str(),
        currency = %input.currency,
        annual_total = annual,
        total_price,
        line_count = breakdown.len(),
        "invoice calculated"
    );

    Ok(InvoiceResult {
        total_price,
        currency: input.currency.clone(),
        breakdown,
        applied_tier,
        applied_discount_percent,
        annual_total: annual,
    })
}

/// The asset breakdown split into standard and overridden assets.
struct Portfolio<'a> {
    standard: Vec<&'a AssetBillingItem>,
    overridden: Vec<(&'a AssetBillingItem, &'a AssetDiscount)>,
    has_breakdown: bool,
    billable_mw: f64,
    site_count: Option<u32>,
}

impl<'a> Portfolio<'a> {
    fn from_input(input: &'a InvoiceComputationInput) -> Self {
        let Some(assets) = input.assets.as_deref() else {
            if !input.asset_discounts.is_empty() {
                warn!(
                    event_name = "pricing.invoice.asset_overrides_ignored",
                    override_count = input.asset_discounts.len(),
                    "asset overrides need an asset breakdown and were ignored"
                );
            }
            return Self {
                standard: Vec::new(),
                overridden: Vec::new(),
                has_breakdown: false,
                billable_mw: input.total_mw,
                site_count: input.site_count,
            };
        };

        let overrides: BTreeMap<&AssetId, &AssetDiscount> =
            input.asset_discounts.iter().map(|discount| (&discount.asset_id, discount)).collect();

        let mut standard = Vec::new();
        let mut overridden = Vec::new();
        for asset in assets {
            match overrides.get(&asset.asset_id) {
                Some(discount) => overridden.push((asset, *discount)),
                None => standard.push(asset),
            }
        }

        let overridden_mw: f64 = overridden.iter().map(|(asset, _)| asset.total_mw).sum();
        let site_count = u32::try_from(standard.len()).unwrap_or(u32::MAX);

        Self {
            standard,
            overridden,
            has_breakdown: true,
            billable_mw: (input.total_mw - overridden_mw).max(0.0),
            site_count: Some(site_count),
        }
    }

    fn hybrid_mw(&self) -> f64 {
        self.standard.iter().filter(|asset| asset.is_hybrid).map(|asset| asset.total_mw).sum()
    }

    fn require_site_count(&self, model: PricingModel) -> Result<u32, PricingError> {
        self.site_count.ok_or(PricingError::MissingField { field: "site_count", model })
    }
}

fn base_component(
    input: &InvoiceComputationInput,
    portfolio: &Portfolio<'_>,
    applied_tier: &mut Option<String>,
) -> Result<Vec<LineItem>, PricingError> {
    let model = input.pricing_model;
    match model {
        PricingModel::PerMwModules | PricingModel::HybridTiered => {
            Ok(module_component(input, portfolio, applied_tier))
        }
        PricingModel::GraduatedMwTiers => {
            if input.mw_tiers.is_empty() {
                return Err(PricingError::MissingField { field: "mw_tiers", model });
            }
            let charge = resolve_graduated(&input.mw_tiers, portfolio.billable_mw);
            *applied_tier = charge.top_tier().map(|tier| tier.display_label());
            Ok(charge
                .per_tier
                .iter()
                .map(|slice| {
                    LineItem::recurring(
                        format!(
                            "{}: {} MW @ {}",
                            slice.tier.display_label(),
                            slice.quantity_in_tier,
                            slice.tier.rate
                        ),
                        slice.cost,
                    )
                })
                .collect())
        }
        PricingModel::Capped | PricingModel::Poc => {
            let monthly = input
                .base_monthly_price
                .ok_or(PricingError::MissingField { field: "base_monthly_price", model })?;
            let label = if model == PricingModel::Capped {
                "Capped platform fee"
            } else {
                "Proof of concept fee"
            };
            Ok(vec![LineItem::recurring(format!("{label} ({monthly}/month)"), monthly * 12.0)])
        }
        PricingModel::PerSite => {
            let monthly = input
                .base_monthly_price
                .ok_or(PricingError::MissingField { field: "base_monthly_price", model })?;
            let sites = portfolio.require_site_count(model)?;
            Ok(vec![LineItem::recurring(
                format!("Per-site fee: {sites} sites x {monthly}/month"),
                monthly * 12.0 * f64::from(sites),
            )])
        }
        PricingModel::QuantityTiers => {
            if input.quantity_tiers.is_empty() {
                return Err(PricingError::MissingField { field: "quantity_tiers", model });
            }
            let sites = portfolio.require_site_count(model)?;
            let Some(tier) = resolve_tier(&input.quantity_tiers, f64::from(sites)) else {
                warn!(
                    event_name = "pricing.tier.unresolved",
                    tier_set = "quantity_tiers",
                    quantity = sites,
                    "no quantity tier matched; check the tier configuration"
                );
                return Ok(Vec::new());
            };
            *applied_tier = Some(tier.display_label());
            Ok(vec![LineItem::recurring(
                format!("{}: {sites} sites @ {}", tier.display_label(), tier.rate),
                tier.rate * f64::from(sites),
            )])
        }
    }
}

fn module_component(
    input: &InvoiceComputationInput,
    portfolio: &Portfolio<'_>,
    applied_tier: &mut Option<String>,
) -> Vec<LineItem> {
    let module_rate: f64 = input.modules.iter().map(|module| module.price()).sum();
    if input.modules.is_empty() {
        warn!(
            event_name = "pricing.invoice.no_modules",
            pricing_model = input.pricing_model.as_str(),
            "module-priced contract has no modules selected"
        );
    }

    let distinguishes_hybrid = input.pricing_model == PricingModel::HybridTiered;
    let hybrid_rate = if distinguishes_hybrid {
        match resolve_tier(&input.hybrid_tiers, input.total_mw) {
            Some(tier) => {
                *applied_tier = Some(tier.display_label());
                tier.rate
            }
            None => {
                if !input.hybrid_tiers.is_empty() {
                    warn!(
                        event_name = "pricing.tier.unresolved",
                        tier_set = "hybrid_tiers",
                        quantity = input.total_mw,
                        "no hybrid tier matched; hybrid sites billed at the module rate"
                    );
                }
                module_rate
            }
        }
    } else {
        module_rate
    };

    if let (Some(site_minimum), true) = (input.site_minimum_annual, portfolio.has_breakdown) {
        return portfolio
            .standard
            .iter()
            .filter(|asset| !asset.needs_onboarding)
            .map(|asset| {
                let rate =
                    if distinguishes_hybrid && asset.is_hybrid { hybrid_rate } else { module_rate };
                let amount = (asset.total_mw * rate).max(site_minimum);
                let kind =
                    if distinguishes_hybrid && asset.is_hybrid { "hybrid" } else { "on-grid" };
                LineItem::recurring(
                    format!("{} ({} MW {kind})", asset.asset_name, asset.total_mw),
                    amount,
                )
            })
            .collect();
    }

    let hybrid_mw = if distinguishes_hybrid { portfolio.hybrid_mw() } else { 0.0 };
    if distinguishes_hybrid && !portfolio.has_breakdown {
        debug!(
            event_name = "pricing.invoice.hybrid_split_unavailable",
            "no asset breakdown; all capacity billed as on-grid"
        );
    }
    let on_grid_mw = (portfolio.billable_mw - hybrid_mw).max(0.0);

    let mut lines: Vec<LineItem> = input
        .modules
        .iter()
        .map(|module| {
            LineItem::recurring(
                format!(
                    "{} ({}): {on_grid_mw} MW",
                    module.definition.name,
                    module.price_source().describe()
                ),
                module.price() * on_grid_mw,
            )
        })
        .collect();

    if hybrid_mw > 0.0 {
        lines.push(LineItem::recurring(
            format!("Hybrid capacity: {hybrid_mw} MW @ {hybrid_rate}"),
            hybrid_mw * hybrid_rate,
        ));
    }

    lines
}

fn apply_portfolio_discount(
    input: &InvoiceComputationInput,
    subtotal: f64,
    recurring: &mut Vec<LineItem>,
) -> Option<f64> {
    if input.discount_tiers.is_empty() {
        return None;
    }
    let Some(tier) = resolve_tier(&input.discount_tiers, input.total_mw) else {
        debug!(
            event_name = "pricing.tier.unresolved",
            tier_set = "discount_tiers",
            quantity = input.total_mw,
            "no discount tier matched"
        );
        return None;
    };
    if tier.rate <= 0.0 {
        return None;
    }

    let discount = subtotal * tier.rate / 100.0;
    recurring.push(LineItem::recurring(
        format!("Portfolio discount {} ({}%)", tier.display_label(), tier.rate),
        -discount,
    ));
    Some(tier.rate)
}

fn minimum_charge_floor(
    input: &InvoiceComputationInput,
    portfolio: &Portfolio<'_>,
) -> Result<Option<f64>, PricingError> {
    match &input.minimum_charge {
        None => Ok(None),
        Some(MinimumCharge::Flat { amount }) => Ok(Some(*amount)),
        Some(MinimumCharge::PerSiteTiers { tiers }) => {
            let sites = portfolio.require_site_count(input.pricing_model)?;
            match resolve_tier(tiers, f64::from(sites)) {
                Some(tier) => Ok(Some(tier.rate * f64::from(sites))),
                None => {
                    warn!(
                        event_name = "pricing.tier.unresolved",
                        tier_set = "minimum_charge",
                        quantity = sites,
                        "no minimum charge tier matched; no floor applied"
                    );
                    Ok(None)
                }
            }
        }
    }
}

fn non_recurring_lines(input: &InvoiceComputationInput) -> Vec<LineItem> {
    let Some(assets) = input.assets.as_deref() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    if let Some(fee) = input.onboarding_fee_per_site {
        lines.extend(
            assets
                .iter()
                .filter(|asset| asset.needs_onboarding)
                .map(|asset| {
                    LineItem::non_recurring(format!("Onboarding: {}", asset.asset_name), fee)
                }),
        );
    }
    if let Some(fee) = input.annual_renewal_fee_per_site {
        lines.extend(assets.iter().filter(|asset| asset.needs_annual_renewal).map(|asset| {
            LineItem::non_recurring(format!("Annual renewal: {}", asset.asset_name), fee)
        }));
    }
    lines
}

fn sum_lines(lines: &[LineItem]) -> f64 {
    lines.iter().map(|line| line.amount).sum()
}

fn check_amount(field: impl Into<String>, value: f64) -> Result<(), PricingError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(PricingError::InvalidNumber { field: field.into(), value })
}

fn check_optional(field: &str, value: Option<f64>) -> Result<(), PricingError> {
    value.map_or(Ok(()), |value| check_amount(field, value))
}

fn validate_input(input: &InvoiceComputationInput) -> Result<(), PricingError> {
    if input.currency.trim().is_empty() {
        return Err(PricingError::MissingCurrency);
    }

    check_amount("total_mw", input.total_mw)?;
    check_optional("base_monthly_price", input.base_monthly_price)?;
    check_optional("minimum_annual_value", input.minimum_annual_value)?;
    check_optional("site_minimum_annual", input.site_minimum_annual)?;
    check_optional("onboarding_fee_per_site", input.onboarding_fee_per_site)?;
    check_optional("annual_renewal_fee_per_site", input.annual_renewal_fee_per_site)?;

    if let Some(MinimumCharge::Flat { amount }) = &input.minimum_charge {
        check_amount("minimum_charge.amount", *amount)?;
    }

    for selection in input.modules.iter().chain(&input.addons) {
        let id = &selection.definition.id.0;
        check_optional(&format!("{id}.custom_price"), selection.custom_price)?;
        check_optional(&format!("{id}.quantity"), selection.quantity)?;
    }

    for asset in input.assets.iter().flatten() {
        check_amount(format!("assets[{}].total_mw", asset.asset_id.0), asset.total_mw)?;
    }
    for discount in &input.asset_discounts {
        check_amount(format!("asset_discounts[{}].price", discount.asset_id.0), discount.price)?;
    }

    Ok(())
}
