use serde::{Deserialize, Serialize};

use super::conflict::ConflictPolicy;
use crate::config::AdvisorConfig;

pub const DEFAULT_RATE_WARNING_PCT: u32 = 10;
pub const DEFAULT_DURATION_MONTHS: u32 = 3;

/// Knobs the advisor applies to every suggestion and assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorPolicy {
    /// A rate gap strictly above this percentage is reported as a mismatch.
    pub rate_warning_threshold_pct: u32,
    pub conflict: ConflictPolicy,
    pub default_duration_months: u32,
}

impl AdvisorPolicy {
    pub fn rate_mismatch(&self, difference_pct: Option<u32>) -> bool {
        difference_pct.is_some_and(|pct| pct > self.rate_warning_threshold_pct)
    }
}

impl Default for AdvisorPolicy {
    fn default() -> Self {
        Self {
            rate_warning_threshold_pct: DEFAULT_RATE_WARNING_PCT,
            conflict: ConflictPolicy::default(),
            default_duration_months: DEFAULT_DURATION_MONTHS,
        }
    }
}

impl From<&AdvisorConfig> for AdvisorPolicy {
    fn from(config: &AdvisorConfig) -> Self {
        Self {
            rate_warning_threshold_pct: config.rate_warning_threshold_pct,
            conflict: ConflictPolicy::new(
                config.conflict_warning_days,
                config.conflict_danger_days,
            ),
            default_duration_months: config.default_duration_months.max(1),
        }
    }
}
