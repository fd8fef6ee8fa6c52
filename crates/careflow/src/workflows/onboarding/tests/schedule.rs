use super::common::{closed_day, time, working_day};
use crate::workflows::onboarding::domain::{DayOfWeek, DaySchedule, TimeRange};
use crate::workflows::onboarding::{validate_against_parent, validate_day_schedules};

fn with_break(
    mut day: DaySchedule,
    start: (u32, u32),
    end: (u32, u32),
) -> DaySchedule {
    day.break_start_time = Some(time(start.0, start.1));
    day.break_end_time = Some(time(end.0, end.1));
    day
}

#[test]
fn consistent_week_has_no_violations() {
    let days = vec![
        working_day(DayOfWeek::Monday, (9, 0), (18, 0)),
        with_break(
            working_day(DayOfWeek::Tuesday, (9, 0), (18, 0)),
            (12, 0),
            (13, 0),
        ),
        closed_day(DayOfWeek::Friday),
    ];

    assert!(validate_day_schedules(&days, "North Complex").is_empty());
}

#[test]
fn duplicate_day_is_reported() {
    let days = vec![
        working_day(DayOfWeek::Monday, (9, 0), (18, 0)),
        working_day(DayOfWeek::Monday, (10, 0), (16, 0)),
    ];

    let violations = validate_day_schedules(&days, "North Complex");

    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].message,
        "North Complex declares monday more than once"
    );
}

#[test]
fn working_day_without_times_is_reported() {
    let days = vec![DaySchedule {
        day_of_week: DayOfWeek::Wednesday,
        is_working_day: true,
        opening_time: Some(time(9, 0)),
        closing_time: None,
        break_start_time: None,
        break_end_time: None,
    }];

    let violations = validate_day_schedules(&days, "North Complex");

    assert_eq!(
        violations[0].message,
        "North Complex is open on wednesday but is missing opening or closing time"
    );
}

#[test]
fn closing_at_or_before_opening_is_rejected() {
    let days = vec![working_day(DayOfWeek::Monday, (18, 0), (9, 0))];

    let violations = validate_day_schedules(&days, "North Complex");

    assert_eq!(
        violations[0].message,
        "North Complex closing time 09:00 on monday must be after opening time 18:00"
    );

    let zero_length = vec![working_day(DayOfWeek::Monday, (9, 0), (9, 0))];
    assert_eq!(validate_day_schedules(&zero_length, "North Complex").len(), 1);
}

#[test]
fn break_outside_working_hours_suggests_the_working_range() {
    let days = vec![with_break(
        working_day(DayOfWeek::Monday, (9, 0), (17, 0)),
        (17, 30),
        (18, 0),
    )];

    let violations = validate_day_schedules(&days, "Cardiology Clinic");

    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].message,
        "Cardiology Clinic break 17:30-18:00 on monday falls outside working hours 09:00-17:00"
    );
    assert_eq!(
        violations[0].suggested_range,
        Some(TimeRange::new(time(9, 0), time(17, 0)))
    );
}

#[test]
fn break_missing_one_bound_is_rejected() {
    let mut day = working_day(DayOfWeek::Monday, (9, 0), (17, 0));
    day.break_start_time = Some(time(12, 0));

    let violations = validate_day_schedules(&[day], "Cardiology Clinic");

    assert_eq!(
        violations[0].message,
        "Cardiology Clinic break on monday must declare both start and end"
    );
}

#[test]
fn child_hours_inside_parent_hours_pass() {
    let parent = vec![working_day(DayOfWeek::Monday, (9, 0), (18, 0))];
    let child = vec![working_day(DayOfWeek::Monday, (9, 0), (17, 0))];

    let check = validate_against_parent(&child, &parent, "North Complex", "Cardiology Clinic");

    assert!(check.is_valid);
    assert!(check.violations.is_empty());
}

#[test]
fn child_hours_outside_parent_hours_suggest_the_parent_range() {
    let parent = vec![working_day(DayOfWeek::Monday, (9, 0), (18, 0))];
    let child = vec![working_day(DayOfWeek::Monday, (8, 0), (19, 0))];

    let check = validate_against_parent(&child, &parent, "North Complex", "Cardiology Clinic");

    assert!(!check.is_valid);
    assert_eq!(check.violations.len(), 1);
    assert_eq!(
        check.violations[0].message,
        "Cardiology Clinic hours 08:00-19:00 on monday must fall within North Complex hours 09:00-18:00"
    );
    assert_eq!(
        check.violations[0].suggested_range,
        Some(TimeRange::new(time(9, 0), time(18, 0)))
    );
}

#[test]
fn child_open_while_parent_closed_is_rejected() {
    let parent = vec![closed_day(DayOfWeek::Friday)];
    let child = vec![working_day(DayOfWeek::Friday, (9, 0), (12, 0))];

    let check = validate_against_parent(&child, &parent, "North Complex", "Cardiology Clinic");

    assert_eq!(
        check.violations[0].message,
        "Cardiology Clinic cannot be open on friday when North Complex is closed"
    );
}

#[test]
fn parent_day_not_listed_counts_as_closed() {
    let parent = vec![working_day(DayOfWeek::Monday, (9, 0), (18, 0))];
    let child = vec![working_day(DayOfWeek::Sunday, (9, 0), (12, 0))];

    let check = validate_against_parent(&child, &parent, "North Complex", "Cardiology Clinic");

    assert!(!check.is_valid);
    assert_eq!(
        check.violations[0].message,
        "Cardiology Clinic cannot be open on sunday when North Complex is closed"
    );
}

#[test]
fn all_violations_are_accumulated() {
    let parent = vec![
        working_day(DayOfWeek::Monday, (9, 0), (18, 0)),
        closed_day(DayOfWeek::Friday),
    ];
    let child = vec![
        working_day(DayOfWeek::Monday, (8, 0), (19, 0)),
        working_day(DayOfWeek::Friday, (9, 0), (12, 0)),
        working_day(DayOfWeek::Sunday, (9, 0), (12, 0)),
    ];

    let check = validate_against_parent(&child, &parent, "North Complex", "Cardiology Clinic");

    assert_eq!(check.violations.len(), 3);
}

#[test]
fn closed_child_days_are_not_checked_against_the_parent() {
    let parent = vec![closed_day(DayOfWeek::Friday)];
    let child = vec![closed_day(DayOfWeek::Friday)];

    let check = validate_against_parent(&child, &parent, "North Complex", "Cardiology Clinic");

    assert!(check.is_valid);
}
