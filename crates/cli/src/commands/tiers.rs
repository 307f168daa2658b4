use std::path::Path;

use serde::{Deserialize, Serialize};
use solbill_core::domain::tier::Tier;
use solbill_core::errors::{ApplicationError, DomainError};
use solbill_core::pricing::{validate_tier_set, TierIssue};

use crate::commands::{read_input, CommandResult};

/// Either a bare tier array or a named set.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TierSetFile {
    Named { name: String, tiers: Vec<Tier> },
    Bare(Vec<Tier>),
}

#[derive(Debug, Serialize)]
struct TierReport {
    name: String,
    tiers: usize,
    issues: Vec<TierIssue>,
}

pub fn run(input: &Path) -> CommandResult {
    let file: TierSetFile = match read_input(input) {
        Ok(file) => file,
        Err(error) => return CommandResult::from_error("tiers", error),
    };

    let (name, tiers) = match file {
        TierSetFile::Named { name, tiers } => (name, tiers),
        TierSetFile::Bare(tiers) => (input.display().to_string(), tiers),
    };
    let issues = validate_tier_set(&tiers);

    if issues.is_empty() {
        let report = TierReport { name, tiers: tiers.len(), issues };
        let message = format!("{} tier(s) cover [0, inf) without overlap", report.tiers);
        return CommandResult::success_with_data("tiers", message, &report);
    }

    let summary = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    let error =
        ApplicationError::from(DomainError::InvalidTierSet { name: name.clone(), issues: summary });
    let data = serde_json::to_value(TierReport { name, tiers: tiers.len(), issues }).ok();
    CommandResult::failure_with_data("tiers", error.error_class(), error.to_string(), 4, data)
}
