use super::date_serde;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::Date;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaceType {
    #[default]
    TasksPerDay,
    EndDate,
}

/// Non-empty set of weekday numbers, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WorkingDays([bool; 7]);

impl WorkingDays {
    pub fn new<I: IntoIterator<Item = u8>>(days: I) -> Result<Self, AppError> {
        let mut mask = [false; 7];
        for day in days {
            let slot = mask
                .get_mut(day as usize)
                .ok_or_else(|| AppError::invalid_input(format!("weekday out of range: {day}")))?;
            *slot = true;
        }

        if !mask.contains(&true) {
            return Err(AppError::invalid_input("at least one working day is required"));
        }

        Ok(Self(mask))
    }

    /// Parses a comma-separated list such as `1,2,3,4,5`.
    pub fn parse_list(raw: &str) -> Result<Self, AppError> {
        let mut days = Vec::new();
        for part in raw.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let day = trimmed
                .parse::<u8>()
                .map_err(|_| AppError::invalid_input(format!("invalid weekday: {trimmed}")))?;
            days.push(day);
        }
        Self::new(days)
    }

    pub fn contains(&self, weekday: u8) -> bool {
        self.0.get(weekday as usize).copied().unwrap_or(false)
    }

    pub fn days(&self) -> Vec<u8> {
        (0u8..7).filter(|day| self.contains(*day)).collect()
    }
}

impl Default for WorkingDays {
    fn default() -> Self {
        Self([false, true, true, true, true, true, false])
    }
}

impl TryFrom<Vec<u8>> for WorkingDays {
    type Error = AppError;

    fn try_from(days: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<WorkingDays> for Vec<u8> {
    fn from(days: WorkingDays) -> Self {
        days.days()
    }
}

impl fmt::Display for WorkingDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = self.days().iter().map(u8::to_string).collect();
        write!(f, "{}", days.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(with = "date_serde")]
    pub start_date: Date,
    #[serde(default, with = "date_serde::option")]
    pub end_date: Option<Date>,
    #[serde(default = "default_tasks_per_day")]
    pub tasks_per_day: u32,
    #[serde(default)]
    pub pace_type: PaceType,
    #[serde(default)]
    pub working_days: WorkingDays,
}

fn default_tasks_per_day() -> u32 {
    1
}

impl Settings {
    pub fn per_day(start_date: Date, tasks_per_day: u32, working_days: WorkingDays) -> Self {
        Self {
            start_date,
            end_date: None,
            tasks_per_day,
            pace_type: PaceType::TasksPerDay,
            working_days,
        }
    }

    pub fn until(start_date: Date, end_date: Date, working_days: WorkingDays) -> Self {
        Self {
            start_date,
            end_date: Some(end_date),
            tasks_per_day: 1,
            pace_type: PaceType::EndDate,
            working_days,
        }
    }
}
