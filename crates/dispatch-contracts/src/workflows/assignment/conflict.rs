use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WARNING_DAYS: i64 = 90;
pub const DEFAULT_DANGER_DAYS: i64 = 30;

/// Proximity of a proposed end date to the factory conflict date (抵触日).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictWarningLevel {
    Ok,
    Warning,
    Danger,
    Expired,
}

impl ConflictWarningLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Expired => "expired",
        }
    }
}

/// Day thresholds for the graduated warning levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPolicy {
    warning_days: i64,
    danger_days: i64,
}

impl ConflictPolicy {
    pub fn new(warning_days: i64, danger_days: i64) -> Self {
        let danger_days = danger_days.max(0);
        Self {
            warning_days: warning_days.max(danger_days),
            danger_days,
        }
    }

    pub fn warning_days(&self) -> i64 {
        self.warning_days
    }

    pub fn danger_days(&self) -> i64 {
        self.danger_days
    }

    pub fn classify(&self, conflict_date: NaiveDate, proposed_end: NaiveDate) -> ConflictDateInfo {
        let days_remaining = (conflict_date - proposed_end).num_days();
        let warning_level = if days_remaining < 0 {
            ConflictWarningLevel::Expired
        } else if days_remaining <= self.danger_days {
            ConflictWarningLevel::Danger
        } else if days_remaining <= self.warning_days {
            ConflictWarningLevel::Warning
        } else {
            ConflictWarningLevel::Ok
        };

        let message = match warning_level {
            ConflictWarningLevel::Expired => format!(
                "proposed end {proposed_end} is {} day(s) past the conflict date {conflict_date}",
                -days_remaining
            ),
            ConflictWarningLevel::Danger => format!(
                "only {days_remaining} day(s) remain between the proposed end {proposed_end} and the conflict date {conflict_date}"
            ),
            ConflictWarningLevel::Warning => format!(
                "{days_remaining} day(s) remain between the proposed end {proposed_end} and the conflict date {conflict_date}"
            ),
            ConflictWarningLevel::Ok => format!(
                "{days_remaining} day(s) of headroom before the conflict date {conflict_date}"
            ),
        };

        ConflictDateInfo {
            conflict_date,
            days_remaining,
            warning_level,
            message,
        }
    }
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_DAYS, DEFAULT_DANGER_DAYS)
    }
}

/// Annotation attached to suggestions; never blocks on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDateInfo {
    pub conflict_date: NaiveDate,
    pub days_remaining: i64,
    pub warning_level: ConflictWarningLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictValidation {
    pub valid: bool,
    pub conflict_date: Option<NaiveDate>,
    pub days_before_conflict: Option<i64>,
    pub message: String,
}

/// `valid` is false exactly when `proposed_end` falls after the conflict date.
pub fn validate_conflict_date(
    conflict_date: Option<NaiveDate>,
    proposed_end: NaiveDate,
) -> ConflictValidation {
    let Some(conflict_date) = conflict_date else {
        return ConflictValidation {
            valid: true,
            conflict_date: None,
            days_before_conflict: None,
            message: "no conflict date registered for this factory".to_string(),
        };
    };

    let days_before_conflict = (conflict_date - proposed_end).num_days();
    let valid = proposed_end <= conflict_date;
    let message = if valid {
        format!(
            "proposed end {proposed_end} is {days_before_conflict} day(s) before the conflict date {conflict_date}"
        )
    } else {
        format!(
            "proposed end {proposed_end} exceeds the conflict date {conflict_date} by {} day(s)",
            -days_before_conflict
        )
    };

    ConflictValidation {
        valid,
        conflict_date: Some(conflict_date),
        days_before_conflict: Some(days_before_conflict),
        message,
    }
}

/// Calendar-month arithmetic without subtracting a day: 2025-01-01 + 3 -> 2025-04-01.
pub fn proposed_end_date(start_date: NaiveDate, duration_months: u32) -> Option<NaiveDate> {
    start_date.checked_add_months(Months::new(duration_months))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn validation_flips_exactly_after_conflict_date() {
        let conflict = date(2025, 3, 1);
        let on_day = validate_conflict_date(Some(conflict), conflict);
        assert!(on_day.valid);
        assert_eq!(on_day.days_before_conflict, Some(0));

        let after = validate_conflict_date(Some(conflict), date(2025, 3, 2));
        assert!(!after.valid);
        assert_eq!(after.days_before_conflict, Some(-1));
        assert!(after.message.contains("exceeds"));

        let before = validate_conflict_date(Some(conflict), date(2024, 12, 1));
        assert!(before.valid);
        assert_eq!(before.days_before_conflict, Some(90));
    }

    #[test]
    fn validation_without_conflict_date_is_always_valid() {
        let result = validate_conflict_date(None, date(2030, 1, 1));
        assert!(result.valid);
        assert!(result.conflict_date.is_none());
        assert!(result.days_before_conflict.is_none());
    }

    #[test]
    fn classify_grades_levels_by_remaining_days() {
        let policy = ConflictPolicy::default();
        let conflict = date(2025, 12, 31);

        let level = |end| policy.classify(conflict, end).warning_level;
        assert_eq!(level(date(2025, 6, 30)), ConflictWarningLevel::Ok);
        assert_eq!(level(date(2025, 10, 2)), ConflictWarningLevel::Warning);
        assert_eq!(level(date(2025, 12, 1)), ConflictWarningLevel::Danger);
        assert_eq!(level(date(2025, 12, 31)), ConflictWarningLevel::Danger);
        assert_eq!(level(date(2026, 1, 1)), ConflictWarningLevel::Expired);
    }

    #[test]
    fn policy_keeps_danger_inside_warning_window() {
        let policy = ConflictPolicy::new(10, 45);
        assert_eq!(policy.danger_days(), 45);
        assert_eq!(policy.warning_days(), 45);

        let negative = ConflictPolicy::new(-5, -5);
        assert_eq!(negative.danger_days(), 0);
        assert_eq!(negative.warning_days(), 0);
    }

    #[test]
    fn proposed_end_adds_calendar_months() {
        assert_eq!(proposed_end_date(date(2025, 1, 1), 3), Some(date(2025, 4, 1)));
        assert_eq!(proposed_end_date(date(2025, 1, 31), 1), Some(date(2025, 2, 28)));
    }
}
