//! Tier lookup: numeric stat values to descriptive labels.

use serde::{Deserialize, Serialize};

/// A labeled numeric range with a descriptive prompt string. Ranges are not
/// required to be contiguous or non-overlapping; lookup is first match in
/// list order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierRange {
    #[serde(rename = "name")]
    pub label: String,
    pub from: i64,
    pub to: i64,
    #[serde(rename = "prompt", default)]
    pub description: String,
}

/// Returns the first tier whose inclusive range contains `value`, or `None`
/// when no tier matches. Callers omit the stat from rendered output in the
/// `None` case rather than clamping to the nearest tier.
pub fn resolve_tier(value: i64, tiers: &[TierRange]) -> Option<&TierRange> {
    tiers.iter().find(|t| value >= t.from && value <= t.to)
}
