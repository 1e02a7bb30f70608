//! Assigns tasks to working days and derives the completion streak.
//!
//! Everything here is pure: inputs are borrowed, results are returned, and
//! "today" is always passed in by the caller.

use crate::calendar::{
    following_day, is_working_day, preceding_day, working_day_on_or_after, working_days_between,
};
use crate::model::{PaceType, Settings, Task, WorkingDays};
use time::Date;
use tracing::{debug, warn};

pub use crate::calendar::next_working_day;

/// How far back the streak scan may walk, measured from today.
pub const STREAK_LOOKBACK_DAYS: i64 = 365;

pub fn effective_tasks_per_day(task_count: usize, settings: &Settings) -> u32 {
    match (settings.pace_type, settings.end_date) {
        (PaceType::EndDate, Some(end_date)) => {
            let days =
                working_days_between(settings.start_date, end_date, &settings.working_days).len();
            if days == 0 {
                warn!(
                    start = %settings.start_date,
                    end = %end_date,
                    "no working days before the end date, falling back to one task per day"
                );
                return 1;
            }
            u32::try_from(task_count.div_ceil(days).max(1)).unwrap_or(u32::MAX)
        }
        _ => settings.tasks_per_day.max(1),
    }
}

/// Returns a copy of `tasks` with every task assigned to a working day, in
/// input order, filling each day up to the effective pace.
pub fn generate_calendar(tasks: &[Task], settings: &Settings) -> Vec<Task> {
    let per_day = effective_tasks_per_day(tasks.len(), settings);
    debug!(tasks = tasks.len(), per_day, "generating calendar");

    let mut cursor = settings.start_date;
    let mut assigned_today = 0;
    let mut scheduled = Vec::with_capacity(tasks.len());

    for task in tasks {
        cursor = working_day_on_or_after(cursor, &settings.working_days);

        let mut task = task.clone();
        task.assigned_date = Some(cursor);
        scheduled.push(task);

        assigned_today += 1;
        if assigned_today >= per_day {
            cursor = following_day(cursor);
            assigned_today = 0;
        }
    }

    scheduled
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayStatus {
    Empty,
    Complete,
    Incomplete,
}

fn day_status(tasks: &[Task], date: Date) -> DayStatus {
    let mut any = false;
    for task in tasks.iter().filter(|task| task.assigned_date == Some(date)) {
        if !task.completed {
            return DayStatus::Incomplete;
        }
        any = true;
    }
    if any {
        DayStatus::Complete
    } else {
        DayStatus::Empty
    }
}

/// Consecutive fully-completed working days ending at `last_completed`.
///
/// Any elapsed working day between `last_completed` and `today` that still
/// has open tasks forfeits the streak entirely. Today itself is exempt.
/// Walking backward, a working day with no tasks neither counts nor breaks
/// the run, while a day with open tasks ends it.
pub fn calculate_streak(
    tasks: &[Task],
    last_completed: Option<Date>,
    working_days: &WorkingDays,
    today: Date,
) -> u32 {
    let Some(last_completed) = last_completed else {
        return 0;
    };

    let mut check = following_day(last_completed);
    while check < today {
        if is_working_day(check, working_days) && day_status(tasks, check) == DayStatus::Incomplete
        {
            debug!(day = %check, "streak broken by an unfinished day");
            return 0;
        }
        check = following_day(check);
    }

    let mut streak = 0;
    check = last_completed;
    loop {
        if is_working_day(check, working_days) {
            match day_status(tasks, check) {
                DayStatus::Complete => streak += 1,
                DayStatus::Incomplete => break,
                DayStatus::Empty => {}
            }
        }

        if check == Date::MIN {
            break;
        }
        check = preceding_day(check);
        if (today - check).whole_days() > STREAK_LOOKBACK_DAYS {
            break;
        }
    }

    streak
}
