//! Assets removed just before invoicing and restored just after.
//!
//! Sync snapshots within `window_days` of the invoice date are split into
//! "before" (on or before the invoice date) and "after". The earliest
//! in-window "before" snapshot is the baseline. Two independent critical
//! alerts can fire:
//! - disappearance: the last pre-invoice MW is below `baseline * (1 - threshold)`;
//! - reappearance: the first post-invoice MW is above `pre_invoice * (1 + threshold)`.
//!
//! At least two "before" snapshots and one "after" snapshot are required.

use chrono::{Duration, NaiveDate};
use serde_json::json;

use super::{AlertSettings, AnomalyCheck, AnomalyInput};
use crate::domain::{
    alert::{AlertSeverity, AlertType, InvoiceAlert},
    history::AssetSyncRecord,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct AssetManipulationCheck;

impl AnomalyCheck for AssetManipulationCheck {
    fn name(&self) -> &'static str {
        "asset_manipulation"
    }

    fn enabled(&self, settings: &AlertSettings) -> bool {
        settings.asset_manipulation_enabled
    }

    fn evaluate(&self, input: &AnomalyInput, settings: &AlertSettings) -> Vec<InvoiceAlert> {
        detect_asset_manipulation(
            input.invoice.invoice_date,
            &input.sync_history,
            settings.asset_manipulation_window_days,
            settings.asset_manipulation_threshold,
        )
    }
}

/// Window lengths that overflow a `Duration` produce no alerts.
pub fn detect_asset_manipulation(
    invoice_date: NaiveDate,
    sync_history: &[AssetSyncRecord],
    window_days: i64,
    threshold: f64,
) -> Vec<InvoiceAlert> {
    let Some(window) = Duration::try_days(window_days) else {
        return Vec::new();
    };
    let window_start = invoice_date.checked_sub_signed(window).unwrap_or(NaiveDate::MIN);
    let window_end = invoice_date.checked_add_signed(window).unwrap_or(NaiveDate::MAX);

    let mut in_window: Vec<&AssetSyncRecord> = sync_history
        .iter()
        .filter(|record| {
            let day = record.synced_at.date_naive();
            day >= window_start && day <= window_end
        })
        .collect();
    in_window.sort_by_key(|record| record.synced_at);

    let (before, after): (Vec<&AssetSyncRecord>, Vec<&AssetSyncRecord>) =
        in_window.into_iter().partition(|record| record.synced_at.date_naive() <= invoice_date);

    let (Some(baseline), Some(pre_invoice), Some(post_invoice)) =
        (before.first(), before.last(), after.first())
    else {
        return Vec::new();
    };
    if before.len() < 2 {
        return Vec::new();
    }

    let window_context = json!({
        "invoice_date": invoice_date.to_string(),
        "window_days": window_days,
        "window_start": window_start.to_string(),
        "window_end": window_end.to_string(),
        "threshold": threshold,
        "before_count": before.len(),
        "after_count": after.len(),
    });

    let mut alerts = Vec::new();

    if pre_invoice.total_mw < baseline.total_mw * (1.0 - threshold) {
        let removed_mw = baseline.total_mw - pre_invoice.total_mw;
        let removed_percent =
            if baseline.total_mw > 0.0 { removed_mw / baseline.total_mw * 100.0 } else { 0.0 };
        alerts.push(InvoiceAlert {
            alert_type: AlertType::AssetsDisappeared,
            severity: AlertSeverity::Critical,
            title: "Assets removed before invoicing".to_string(),
            description: format!(
                "Monitored capacity fell from {:.2} MW to {:.2} MW ({removed_percent:.1}%) \
                 in the {window_days} days before the {invoice_date} invoice.",
                baseline.total_mw, pre_invoice.total_mw
            ),
            metadata: with_window(
                json!({
                    "baseline_mw": baseline.total_mw,
                    "baseline_synced_at": baseline.synced_at.to_rfc3339(),
                    "pre_invoice_mw": pre_invoice.total_mw,
                    "pre_invoice_synced_at": pre_invoice.synced_at.to_rfc3339(),
                    "removed_mw": removed_mw,
                    "removed_percent": removed_percent,
                }),
                &window_context,
            ),
        });
    }

    if post_invoice.total_mw > pre_invoice.total_mw * (1.0 + threshold) {
        let returned_mw = post_invoice.total_mw - pre_invoice.total_mw;
        let returned_percent = if pre_invoice.total_mw > 0.0 {
            returned_mw / pre_invoice.total_mw * 100.0
        } else {
            0.0
        };
        alerts.push(InvoiceAlert {
            alert_type: AlertType::AssetsReappeared,
            severity: AlertSeverity::Critical,
            title: "Assets returned after invoicing".to_string(),
            description: format!(
                "Monitored capacity rose from {:.2} MW to {:.2} MW ({returned_percent:.1}%) \
                 after the {invoice_date} invoice.",
                pre_invoice.total_mw, post_invoice.total_mw
            ),
            metadata: with_window(
                json!({
                    "pre_invoice_mw": pre_invoice.total_mw,
                    "pre_invoice_synced_at": pre_invoice.synced_at.to_rfc3339(),
                    "post_invoice_mw": post_invoice.total_mw,
                    "post_invoice_synced_at": post_invoice.synced_at.to_rfc3339(),
                    "returned_mw": returned_mw,
                    "returned_percent": returned_percent,
                }),
                &window_context,
            ),
        });
    }

    alerts
}

fn with_window(mut metadata: serde_json::Value, window: &serde_json::Value) -> serde_json::Value {
    if let (Some(target), Some(source)) = (metadata.as_object_mut(), window.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::fixtures::{invoice_date, sync};

    fn run(history: &[AssetSyncRecord]) -> Vec<InvoiceAlert> {
        detect_asset_manipulation(invoice_date(), history, 30, 0.05)
    }

    #[test]
    fn forty_percent_dip_and_recovery_raises_two_alerts() {
        let alerts = run(&[sync(-20, 100.0, 10), sync(-2, 60.0, 6), sync(3, 100.0, 10)]);

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].alert_type, AlertType::AssetsDisappeared);
        assert_eq!(alerts[1].alert_type, AlertType::AssetsReappeared);
        assert!(alerts.iter().all(|alert| alert.severity == AlertSeverity::Critical));
        assert_eq!(alerts[0].metadata["removed_mw"].as_f64(), Some(40.0));
        assert_eq!(alerts[1].metadata["window_days"].as_i64(), Some(30));
    }

    #[test]
    fn two_percent_dip_is_noise() {
        assert!(run(&[sync(-20, 100.0, 10), sync(-2, 98.0, 10), sync(3, 100.0, 10)]).is_empty());
    }

    #[test]
    fn permanent_removal_only_raises_disappearance() {
        let alerts = run(&[sync(-20, 100.0, 10), sync(-2, 60.0, 6), sync(3, 60.0, 6)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::AssetsDisappeared);
    }

    #[test]
    fn growth_after_invoice_alone_raises_reappearance() {
        let alerts = run(&[sync(-20, 60.0, 6), sync(-2, 60.0, 6), sync(3, 100.0, 10)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::AssetsReappeared);
    }

    #[test]
    fn insufficient_snapshots_raise_nothing() {
        assert!(run(&[sync(-2, 60.0, 6), sync(3, 100.0, 10)]).is_empty());
        assert!(run(&[sync(-20, 100.0, 10), sync(-2, 60.0, 6)]).is_empty());
    }

    #[test]
    fn snapshots_outside_window_are_ignored() {
        let alerts = run(&[
            sync(-45, 100.0, 10),
            sync(-20, 60.0, 6),
            sync(-2, 60.0, 6),
            sync(40, 100.0, 10),
        ]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn unordered_history_is_sorted_first() {
        let alerts = run(&[sync(3, 100.0, 10), sync(-2, 60.0, 6), sync(-20, 100.0, 10)]);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn overflowing_window_yields_no_alerts() {
        let history = [sync(-20, 100.0, 10), sync(-2, 60.0, 6), sync(3, 100.0, 10)];
        let alerts = detect_asset_manipulation(invoice_date(), &history, i64::MAX / 1000, 0.05);
        assert!(alerts.is_empty());
    }
}
