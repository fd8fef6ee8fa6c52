use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::domain::{DayOfWeek, DaySchedule, TimeRange};

/// One schedule rule violation. `suggested_range` carries the parent's actual
/// interval when the child simply needs to shrink into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleViolation {
    pub day_of_week: DayOfWeek,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_range: Option<TimeRange>,
}

impl ScheduleViolation {
    fn new(day: DayOfWeek, message: String) -> Self {
        Self {
            day_of_week: day,
            message,
            suggested_range: None,
        }
    }

    fn with_range(day: DayOfWeek, message: String, range: TimeRange) -> Self {
        Self {
            day_of_week: day,
            message,
            suggested_range: Some(range),
        }
    }
}

/// Result of a hierarchical schedule check; every violation is collected so a
/// caller can present the full report in one round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleCheck {
    pub is_valid: bool,
    pub violations: Vec<ScheduleViolation>,
}

impl ScheduleCheck {
    fn from_violations(violations: Vec<ScheduleViolation>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
        }
    }
}

/// Check one entity's schedule for internal consistency.
///
/// A working day needs opening and closing times, closing strictly after
/// opening, and any declared break must nest inside the working interval.
pub fn validate_day_schedules(days: &[DaySchedule], label: &str) -> Vec<ScheduleViolation> {
    let mut violations = Vec::new();
    let mut seen: HashSet<DayOfWeek> = HashSet::new();

    for day in days {
        if !seen.insert(day.day_of_week) {
            violations.push(ScheduleViolation::new(
                day.day_of_week,
                format!("{label} declares {} more than once", day.day_of_week),
            ));
            continue;
        }

        if !day.is_working_day {
            continue;
        }

        let range = match day.working_range() {
            Some(range) => range,
            None => {
                violations.push(ScheduleViolation::new(
                    day.day_of_week,
                    format!(
                        "{label} is open on {} but is missing opening or closing time",
                        day.day_of_week
                    ),
                ));
                continue;
            }
        };

        if range.end <= range.start {
            violations.push(ScheduleViolation::new(
                day.day_of_week,
                format!(
                    "{label} closing time {} on {} must be after opening time {}",
                    range.end.format(super::domain::hhmm::FORMAT),
                    day.day_of_week,
                    range.start.format(super::domain::hhmm::FORMAT),
                ),
            ));
            continue;
        }

        violations.extend(check_break(day, &range, label));
    }

    violations
}

fn check_break(day: &DaySchedule, range: &TimeRange, label: &str) -> Option<ScheduleViolation> {
    if day.break_start_time.is_none() && day.break_end_time.is_none() {
        return None;
    }

    let break_range = match day.break_range() {
        Some(break_range) => break_range,
        None => {
            return Some(ScheduleViolation::new(
                day.day_of_week,
                format!(
                    "{label} break on {} must declare both start and end",
                    day.day_of_week
                ),
            ));
        }
    };

    if break_range.end <= break_range.start {
        return Some(ScheduleViolation::new(
            day.day_of_week,
            format!(
                "{label} break end {} on {} must be after break start {}",
                break_range.end.format(super::domain::hhmm::FORMAT),
                day.day_of_week,
                break_range.start.format(super::domain::hhmm::FORMAT),
            ),
        ));
    }

    if !range.contains(&break_range) {
        return Some(ScheduleViolation::with_range(
            day.day_of_week,
            format!(
                "{label} break {break_range} on {} falls outside working hours {range}",
                day.day_of_week
            ),
            *range,
        ));
    }

    None
}

/// Check a child schedule against its parent's, day by day.
///
/// Pure relative to the two schedules it is given: a day the parent does not
/// list counts as closed, both-open days require the child interval to be a
/// subset of the parent's, and child breaks must nest in the child's own
/// working interval. All violations are accumulated rather than failing fast.
pub fn validate_against_parent(
    child: &[DaySchedule],
    parent: &[DaySchedule],
    parent_label: &str,
    child_label: &str,
) -> ScheduleCheck {
    let parent_days: HashMap<DayOfWeek, &DaySchedule> = parent
        .iter()
        .map(|day| (day.day_of_week, day))
        .collect();

    let mut violations = Vec::new();

    for day in child {
        if !day.is_working_day {
            continue;
        }

        let parent_day = parent_days.get(&day.day_of_week);
        let parent_open = parent_day
            .filter(|parent_day| parent_day.is_working_day)
            .and_then(|parent_day| parent_day.working_range());

        let parent_range = match parent_open {
            Some(range) => range,
            None => {
                violations.push(ScheduleViolation::new(
                    day.day_of_week,
                    format!(
                        "{child_label} cannot be open on {} when {parent_label} is closed",
                        day.day_of_week
                    ),
                ));
                continue;
            }
        };

        let child_range = match day.working_range() {
            Some(range) => range,
            None => {
                violations.push(ScheduleViolation::new(
                    day.day_of_week,
                    format!(
                        "{child_label} is open on {} but is missing opening or closing time",
                        day.day_of_week
                    ),
                ));
                continue;
            }
        };

        if !parent_range.contains(&child_range) {
            violations.push(ScheduleViolation::with_range(
                day.day_of_week,
                format!(
                    "{child_label} hours {child_range} on {} must fall within {parent_label} hours {parent_range}",
                    day.day_of_week
                ),
                parent_range,
            ));
        }

        violations.extend(check_break(day, &child_range, child_label));
    }

    ScheduleCheck::from_violations(violations)
}
