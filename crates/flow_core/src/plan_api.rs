use crate::calendar::{CalendarCell, month_view, parse_local_date};
use crate::error::AppError;
use crate::model::{Plan, Settings, Task};
use crate::scheduler::{calculate_streak, generate_calendar, next_working_day};
use crate::storage::json_store;
use crate::task_list::{parse_task_list, tasks_to_text};
use crate::timer::{self, Clock, SystemClock};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use time::{Date, Month, OffsetDateTime, UtcOffset};
use tracing::info;

const TODAY_ENV_VAR: &str = "FLOW_TODAY";

#[derive(Debug, Clone)]
pub struct OpenedPlan {
    pub plan: Plan,
    pub selected_date: Date,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub task: Task,
    pub streak: u32,
    /// Every task on the completed task's day is now done.
    pub day_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone)]
pub struct ActiveTimer {
    pub task: Task,
    pub elapsed_secs: u64,
}

/// The local calendar date, unless pinned with `FLOW_TODAY`.
pub fn today() -> Result<Date, AppError> {
    if let Ok(value) = std::env::var(TODAY_ENV_VAR)
        && !value.trim().is_empty()
    {
        return parse_local_date(&value);
    }

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

pub fn create_plan(text: &str, settings: Settings) -> Result<Plan, AppError> {
    let path = json_store::store_path()?;
    create_plan_with_path(&path, text, settings)
}

pub fn open_plan(today: Date) -> Result<OpenedPlan, AppError> {
    let path = json_store::store_path()?;
    open_plan_with_path(&path, today)
}

pub fn tasks_for_date(date: Date) -> Result<Vec<Task>, AppError> {
    let path = json_store::store_path()?;
    let plan = json_store::require_plan(&path)?;
    Ok(day_tasks(&plan, date))
}

pub fn complete_task(id: u32, today: Date) -> Result<Completion, AppError> {
    let path = json_store::store_path()?;
    complete_task_with_path(&path, id, today, SystemClock.now())
}

pub fn move_task(id: u32) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    move_task_with_path(&path, id)
}

pub fn delete_task(id: u32) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    delete_task_with_path(&path, id, SystemClock.now())
}

pub fn reorder_day(date: Date, ordered_ids: &[u32]) -> Result<Vec<Task>, AppError> {
    let path = json_store::store_path()?;
    reorder_day_with_path(&path, date, ordered_ids)
}

pub fn edit_tasks(text: &str) -> Result<Plan, AppError> {
    let path = json_store::store_path()?;
    edit_tasks_with_path(&path, text, SystemClock.now())
}

pub fn export_text() -> Result<String, AppError> {
    let path = json_store::store_path()?;
    Ok(tasks_to_text(&json_store::require_plan(&path)?.tasks))
}

pub fn progress() -> Result<Progress, AppError> {
    let path = json_store::store_path()?;
    Ok(plan_progress(&json_store::require_plan(&path)?.tasks))
}

pub fn month(year: i32, month: Month, today: Date) -> Result<Vec<CalendarCell>, AppError> {
    let path = json_store::store_path()?;
    let plan = json_store::require_plan(&path)?;
    month_view(year, month, &plan.tasks, today)
}

pub fn reset() -> Result<bool, AppError> {
    let path = json_store::store_path()?;
    let removed = json_store::clear_plan(&path)?;
    if removed {
        info!(path = %path.display(), "plan removed");
    }
    Ok(removed)
}

pub fn start_timer(id: u32, now: OffsetDateTime) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    start_timer_with_path(&path, id, now)
}

pub fn stop_timer(now: OffsetDateTime) -> Result<ActiveTimer, AppError> {
    let path = json_store::store_path()?;
    stop_timer_with_path(&path, now)
}

/// The running task and its elapsed time as of `now`, if any.
pub fn active_elapsed(now: OffsetDateTime) -> Result<Option<ActiveTimer>, AppError> {
    let path = json_store::store_path()?;
    active_elapsed_with_path(&path, now)
}

fn create_plan_with_path(path: &Path, text: &str, settings: Settings) -> Result<Plan, AppError> {
    let tasks = parse_task_list(text);
    if tasks.is_empty() {
        return Err(AppError::invalid_input(
            "no tasks found, put one task per line",
        ));
    }

    let plan = Plan::new(generate_calendar(&tasks, &settings), settings);
    json_store::save_plan(path, &plan)?;
    info!(tasks = plan.tasks.len(), "plan created");

    Ok(plan)
}

fn open_plan_with_path(path: &Path, today: Date) -> Result<OpenedPlan, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let streak = calculate_streak(
        &plan.tasks,
        plan.stats.last_completed_date,
        &plan.settings.working_days,
        today,
    );
    if streak != plan.stats.streak {
        plan.stats.streak = streak;
        json_store::save_plan(path, &plan)?;
    }

    let selected_date = default_selected_date(&plan, today);
    Ok(OpenedPlan {
        plan,
        selected_date,
    })
}

/// Today if it has tasks, else the earliest day with open work, else the
/// first task's day.
pub fn default_selected_date(plan: &Plan, today: Date) -> Date {
    if plan.tasks_on(today).next().is_some() {
        return today;
    }

    plan.tasks
        .iter()
        .filter(|task| !task.completed)
        .filter_map(|task| task.assigned_date)
        .min()
        .or_else(|| plan.tasks.first().and_then(|task| task.assigned_date))
        .unwrap_or(today)
}

/// Tasks assigned to `date`, open ones first, each group in stored order.
pub fn day_tasks(plan: &Plan, date: Date) -> Vec<Task> {
    let (mut open, done): (Vec<Task>, Vec<Task>) = plan
        .tasks_on(date)
        .cloned()
        .partition(|task| !task.completed);
    open.extend(done);
    open
}

pub fn plan_progress(tasks: &[Task]) -> Progress {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let percentage = if total == 0 {
        0
    } else {
        // Round half up.
        ((completed * 200 + total) / (total * 2)) as u32
    };

    Progress {
        completed,
        total,
        percentage,
    }
}

fn complete_task_with_path(
    path: &Path,
    id: u32,
    today: Date,
    now: OffsetDateTime,
) -> Result<Completion, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let task = plan
        .task(id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }

    timer::stop_if_active(&mut plan, id, now);
    let task = plan
        .task_mut(id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;
    task.completed = true;
    let completed = task.clone();

    plan.stats.last_completed_date = Some(today);
    plan.stats.streak = calculate_streak(
        &plan.tasks,
        plan.stats.last_completed_date,
        &plan.settings.working_days,
        today,
    );

    let day_finished = completed
        .assigned_date
        .is_some_and(|date| plan.tasks_on(date).all(|task| task.completed));

    json_store::save_plan(path, &plan)?;
    info!(task = id, streak = plan.stats.streak, "task completed");

    Ok(Completion {
        task: completed,
        streak: plan.stats.streak,
        day_finished,
    })
}

fn move_task_with_path(path: &Path, id: u32) -> Result<Task, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let working_days = plan.settings.working_days;
    let task = plan
        .task_mut(id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;

    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }
    let current = task
        .assigned_date
        .ok_or_else(|| AppError::invalid_input("task is not scheduled"))?;

    task.assigned_date = Some(next_working_day(current, &working_days));
    let moved = task.clone();
    json_store::save_plan(path, &plan)?;
    info!(task = id, "task moved to the next working day");

    Ok(moved)
}

fn delete_task_with_path(path: &Path, id: u32, now: OffsetDateTime) -> Result<Task, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let index = plan
        .tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;

    timer::stop_if_active(&mut plan, id, now);
    let removed = plan.tasks.remove(index);
    json_store::save_plan(path, &plan)?;
    info!(task = id, "task deleted");

    Ok(removed)
}

fn reorder_day_with_path(path: &Path, date: Date, ordered_ids: &[u32]) -> Result<Vec<Task>, AppError> {
    let mut plan = json_store::require_plan(path)?;

    let slots: Vec<usize> = plan
        .tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| task.assigned_date == Some(date) && !task.completed)
        .map(|(index, _)| index)
        .collect();

    let current: HashSet<u32> = slots.iter().map(|&index| plan.tasks[index].id).collect();
    let requested: HashSet<u32> = ordered_ids.iter().copied().collect();
    if requested.len() != ordered_ids.len() {
        return Err(AppError::invalid_input("task ids must not repeat"));
    }
    if requested != current {
        return Err(AppError::invalid_input(
            "order must list every open task of that day exactly once",
        ));
    }

    let mut reordered = Vec::with_capacity(slots.len());
    for id in ordered_ids {
        if let Some(task) = plan.task(*id) {
            reordered.push(task.clone());
        }
    }
    for (slot, task) in slots.into_iter().zip(reordered) {
        plan.tasks[slot] = task;
    }

    json_store::save_plan(path, &plan)?;
    info!(day = %date, "day reordered");

    Ok(day_tasks(&plan, date))
}

fn edit_tasks_with_path(path: &Path, text: &str, now: OffsetDateTime) -> Result<Plan, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let mut tasks = parse_task_list(text);
    if tasks.is_empty() {
        return Err(AppError::invalid_input(
            "no tasks found, put one task per line",
        ));
    }

    // Ids are reassigned by the parser, so the running session is banked first.
    if let Some(active_id) = plan.stats.active_task_id {
        timer::stop_if_active(&mut plan, active_id, now);
    }

    let mut carried: HashMap<&str, (bool, u64)> = HashMap::new();
    for task in &plan.tasks {
        let entry = carried
            .entry(task.text.as_str())
            .or_insert((false, task.time_spent_secs));
        entry.0 |= task.completed;
    }
    for task in &mut tasks {
        if let Some(&(completed, time_spent_secs)) = carried.get(task.text.as_str()) {
            task.completed = completed;
            task.time_spent_secs = time_spent_secs;
        }
    }

    plan.tasks = generate_calendar(&tasks, &plan.settings);
    json_store::save_plan(path, &plan)?;
    info!(tasks = plan.tasks.len(), "task list replaced");

    Ok(plan)
}

fn start_timer_with_path(path: &Path, id: u32, now: OffsetDateTime) -> Result<Task, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let task = timer::start_timer(&mut plan, id, now)?;
    json_store::save_plan(path, &plan)?;
    Ok(task)
}

fn stop_timer_with_path(path: &Path, now: OffsetDateTime) -> Result<ActiveTimer, AppError> {
    let mut plan = json_store::require_plan(path)?;
    let task = timer::stop_timer(&mut plan, now)?;
    json_store::save_plan(path, &plan)?;
    Ok(ActiveTimer {
        elapsed_secs: task.time_spent_secs,
        task,
    })
}

fn active_elapsed_with_path(
    path: &Path,
    now: OffsetDateTime,
) -> Result<Option<ActiveTimer>, AppError> {
    let plan = json_store::require_plan(path)?;
    Ok(plan
        .stats
        .active_task_id
        .and_then(|id| plan.task(id))
        .map(|task| ActiveTimer {
            elapsed_secs: timer::elapsed_secs(task, now),
            task: task.clone(),
        }))
}
