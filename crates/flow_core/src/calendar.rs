//! Calendar-date arithmetic.
//!
//! Dates are plain calendar days (`time::Date`). Nothing here touches a
//! time zone, so a `YYYY-MM-DD` string always round-trips to the same day.

use crate::error::AppError;
use crate::model::{Task, WorkingDays};
use time::macros::format_description;
use time::{Date, Duration, Month};

pub fn parse_local_date(value: &str) -> Result<Date, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("date is required"));
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input(format!("date must be YYYY-MM-DD: {trimmed}")))
}

pub fn format_date(date: Date) -> String {
    // The format only has numeric components, so it cannot fail for a valid Date.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| {
            format!(
                "{}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            )
        })
}

pub fn is_working_day(date: Date, working_days: &WorkingDays) -> bool {
    working_days.contains(date.weekday().number_days_from_sunday())
}

pub(crate) fn following_day(date: Date) -> Date {
    date.saturating_add(Duration::DAY)
}

pub(crate) fn preceding_day(date: Date) -> Date {
    date.saturating_sub(Duration::DAY)
}

/// Returns `date` itself when it is a working day, otherwise the next one.
pub fn working_day_on_or_after(date: Date, working_days: &WorkingDays) -> Date {
    let mut current = date;
    // A non-empty weekday set always matches within a week.
    for _ in 0..7 {
        if is_working_day(current, working_days) {
            return current;
        }
        current = following_day(current);
    }
    current
}

/// All working days from `start` to `end`, both inclusive.
pub fn working_days_between(start: Date, end: Date, working_days: &WorkingDays) -> Vec<Date> {
    let mut days = Vec::new();
    let mut current = start;

    while current <= end {
        if is_working_day(current, working_days) {
            days.push(current);
        }
        if current == Date::MAX {
            break;
        }
        current = following_day(current);
    }

    days
}

pub fn tasks_per_day_for_range(
    start: Date,
    end: Date,
    task_count: usize,
    working_days: &WorkingDays,
) -> u32 {
    let days = working_days_between(start, end, working_days).len();
    if days == 0 {
        return 1;
    }
    let per_day = task_count.div_ceil(days).max(1);
    u32::try_from(per_day).unwrap_or(u32::MAX)
}

/// The working day on which the last of `task_count` tasks lands at a fixed pace.
pub fn calculate_end_date(
    start: Date,
    task_count: usize,
    tasks_per_day: u32,
    working_days: &WorkingDays,
) -> Date {
    let per_day = tasks_per_day.max(1) as usize;
    let days_needed = task_count.div_ceil(per_day).max(1);

    let mut current = working_day_on_or_after(start, working_days);
    for _ in 1..days_needed {
        current = next_working_day(current, working_days);
    }
    current
}

/// Earliest working day strictly after `date`.
pub fn next_working_day(date: Date, working_days: &WorkingDays) -> Date {
    working_day_on_or_after(following_day(date), working_days)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: Date,
    pub tasks: Vec<Task>,
    pub is_today: bool,
    pub is_past: bool,
    pub has_tasks: bool,
    pub all_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    Padding,
    Day(CalendarDay),
}

/// A Sunday-first month grid with leading padding cells.
pub fn month_view(
    year: i32,
    month: Month,
    tasks: &[Task],
    today: Date,
) -> Result<Vec<CalendarCell>, AppError> {
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|err| AppError::invalid_input(err.to_string()))?;
    let padding = first.weekday().number_days_from_sunday() as usize;

    let mut cells = Vec::with_capacity(padding + 31);
    cells.extend(std::iter::repeat_n(CalendarCell::Padding, padding));

    let mut current = Some(first);
    while let Some(date) = current.filter(|date| date.month() == month) {
        current = date.next_day();
        let day_tasks: Vec<Task> = tasks
            .iter()
            .filter(|task| task.assigned_date == Some(date))
            .cloned()
            .collect();
        let has_tasks = !day_tasks.is_empty();
        let all_completed = has_tasks && day_tasks.iter().all(|task| task.completed);

        cells.push(CalendarCell::Day(CalendarDay {
            date,
            tasks: day_tasks,
            is_today: date == today,
            is_past: date < today,
            has_tasks,
            all_completed,
        }));
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::{
        CalendarCell, calculate_end_date, format_date, is_working_day, month_view,
        next_working_day, parse_local_date, tasks_per_day_for_range, working_days_between,
    };
    use crate::model::{Task, WorkingDays};
    use time::macros::date;
    use time::Month;

    fn weekdays() -> WorkingDays {
        WorkingDays::new([1, 2, 3, 4, 5]).unwrap()
    }

    #[test]
    fn parse_and_format_keep_the_calendar_day() {
        let parsed = parse_local_date("2024-03-09").unwrap();
        assert_eq!(parsed, date!(2024 - 03 - 09));
        assert_eq!(format_date(parsed), "2024-03-09");
    }

    #[test]
    fn parse_local_date_rejects_garbage() {
        assert_eq!(parse_local_date("03/09/2024").unwrap_err().code(), "invalid_input");
        assert_eq!(parse_local_date("  ").unwrap_err().code(), "invalid_input");
        assert_eq!(parse_local_date("2024-02-30").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn weekend_is_not_a_working_day() {
        assert!(is_working_day(date!(2024 - 01 - 05), &weekdays()));
        assert!(!is_working_day(date!(2024 - 01 - 06), &weekdays()));
        assert!(!is_working_day(date!(2024 - 01 - 07), &weekdays()));
    }

    #[test]
    fn working_days_between_is_inclusive() {
        let days = working_days_between(date!(2024 - 01 - 01), date!(2024 - 01 - 07), &weekdays());
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], date!(2024 - 01 - 01));
        assert_eq!(days[4], date!(2024 - 01 - 05));
    }

    #[test]
    fn working_days_between_reversed_range_is_empty() {
        let days = working_days_between(date!(2024 - 01 - 05), date!(2024 - 01 - 01), &weekdays());
        assert!(days.is_empty());
    }

    #[test]
    fn tasks_per_day_for_range_rounds_up_and_falls_back_to_one() {
        let start = date!(2024 - 01 - 01);
        assert_eq!(tasks_per_day_for_range(start, date!(2024 - 01 - 05), 11, &weekdays()), 3);
        assert_eq!(tasks_per_day_for_range(start, date!(2024 - 01 - 05), 2, &weekdays()), 1);
        let weekend_only = WorkingDays::new([0, 6]).unwrap();
        assert_eq!(tasks_per_day_for_range(start, date!(2024 - 01 - 05), 9, &weekend_only), 1);
    }

    #[test]
    fn next_working_day_skips_weekend() {
        let friday = date!(2024 - 01 - 05);
        assert_eq!(next_working_day(friday, &weekdays()), date!(2024 - 01 - 08));
    }

    #[test]
    fn next_working_day_never_returns_same_day() {
        let every_day = WorkingDays::new(0..=6).unwrap();
        let monday = date!(2024 - 01 - 01);
        assert_eq!(next_working_day(monday, &every_day), date!(2024 - 01 - 02));
    }

    #[test]
    fn next_working_day_composes() {
        let mut day = date!(2024 - 01 - 04);
        for _ in 0..3 {
            day = next_working_day(day, &weekdays());
        }
        assert_eq!(day, date!(2024 - 01 - 09));
    }

    #[test]
    fn calculate_end_date_counts_working_days() {
        // 7 tasks at 2 per day need 4 working days: Mon..Thu.
        let end = calculate_end_date(date!(2024 - 01 - 01), 7, 2, &weekdays());
        assert_eq!(end, date!(2024 - 01 - 04));

        // Starting on Saturday moves to Monday first.
        let end = calculate_end_date(date!(2024 - 01 - 06), 1, 5, &weekdays());
        assert_eq!(end, date!(2024 - 01 - 08));
    }

    #[test]
    fn month_view_pads_to_first_weekday() {
        let tasks = vec![
            Task {
                assigned_date: Some(date!(2024 - 02 - 01)),
                completed: true,
                ..Task::new(1, "done")
            },
            Task {
                assigned_date: Some(date!(2024 - 02 - 02)),
                ..Task::new(2, "open")
            },
        ];
        let cells = month_view(2024, Month::February, &tasks, date!(2024 - 02 - 02)).unwrap();

        // 2024-02-01 is a Thursday.
        assert_eq!(cells.len(), 4 + 29);
        assert!(cells[..4].iter().all(|cell| *cell == CalendarCell::Padding));

        match &cells[4] {
            CalendarCell::Day(day) => {
                assert_eq!(day.date, date!(2024 - 02 - 01));
                assert!(day.has_tasks);
                assert!(day.all_completed);
                assert!(day.is_past);
                assert!(!day.is_today);
            }
            CalendarCell::Padding => panic!("expected a day cell"),
        }
        match &cells[5] {
            CalendarCell::Day(day) => {
                assert!(day.is_today);
                assert!(!day.all_completed);
            }
            CalendarCell::Padding => panic!("expected a day cell"),
        }
    }
}
