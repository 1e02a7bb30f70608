//! Per-task time tracking and the display refresh tick.
//!
//! Elapsed time is never counted tick by tick. A running task stores the
//! wall-clock second it was started at, and every reading recomputes
//! `time_spent_secs + (now - started_at)`.

use crate::error::AppError;
use crate::model::{Plan, Task};
use std::ops::ControlFlow;
use time::OffsetDateTime;
use tracing::debug;

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub fn elapsed_secs(task: &Task, now: OffsetDateTime) -> u64 {
    let running = task
        .started_at
        .map(|started_at| now.unix_timestamp().saturating_sub(started_at).max(0) as u64)
        .unwrap_or(0);
    task.time_spent_secs.saturating_add(running)
}

pub fn format_elapsed(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Starts timing `id`, stopping whichever task was running before.
pub fn start_timer(plan: &mut Plan, id: u32, now: OffsetDateTime) -> Result<Task, AppError> {
    let task = plan
        .task(id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }

    if plan.stats.active_task_id == Some(id) {
        return Ok(task.clone());
    }

    if let Some(previous) = plan.stats.active_task_id {
        fold_running_time(plan, previous, now);
    }

    let task = plan
        .task_mut(id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;
    task.started_at = Some(now.unix_timestamp());
    let started = task.clone();
    plan.stats.active_task_id = Some(id);
    debug!(task = id, "timer started");

    Ok(started)
}

pub fn stop_timer(plan: &mut Plan, now: OffsetDateTime) -> Result<Task, AppError> {
    let id = plan
        .stats
        .active_task_id
        .ok_or_else(|| AppError::invalid_input("no active timer"))?;
    fold_running_time(plan, id, now);
    plan.task(id)
        .cloned()
        .ok_or_else(|| AppError::invalid_data("active task not found"))
}

/// Stops the timer if `id` is the active task. Used before completing or
/// deleting a task.
pub(crate) fn stop_if_active(plan: &mut Plan, id: u32, now: OffsetDateTime) {
    if plan.stats.active_task_id == Some(id) {
        fold_running_time(plan, id, now);
    }
}

fn fold_running_time(plan: &mut Plan, id: u32, now: OffsetDateTime) {
    if let Some(task) = plan.task_mut(id) {
        task.time_spent_secs = elapsed_secs(task, now);
        task.started_at = None;
        debug!(task = id, spent = task.time_spent_secs, "timer stopped");
    }
    plan.stats.active_task_id = None;
}

/// A recurring callback driven by a [`Clock`].
///
/// Each tick reads the clock afresh, so a late or skipped tick never skews
/// what the callback sees.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: std::time::Duration,
    max_ticks: Option<u64>,
}

impl Ticker {
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            interval,
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Fires immediately, then once per interval until the callback breaks
    /// or the tick limit is reached. Returns the number of ticks delivered.
    pub fn run<C, F>(&self, clock: &C, mut on_tick: F) -> u64
    where
        C: Clock + ?Sized,
        F: FnMut(OffsetDateTime) -> ControlFlow<()>,
    {
        let mut ticks = 0;
        loop {
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            ticks += 1;
            if on_tick(clock.now()).is_break() {
                break;
            }
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            std::thread::sleep(self.interval);
        }
        ticks
    }
}
