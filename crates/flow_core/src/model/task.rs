use super::date_serde;
use super::settings::Settings;
use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "date_serde::option")]
    pub assigned_date: Option<Date>,
    #[serde(default)]
    pub time_spent_secs: u64,
    /// Unix seconds at which the running timer was started.
    #[serde(default)]
    pub started_at: Option<i64>,
}

impl Task {
    pub fn new<T: Into<String>>(id: u32, text: T) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            assigned_date: None,
            time_spent_secs: 0,
            started_at: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub streak: u32,
    #[serde(default, with = "date_serde::option")]
    pub last_completed_date: Option<Date>,
    #[serde(default)]
    pub active_task_id: Option<u32>,
}

/// The whole application state. Persisted through the store's document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub tasks: Vec<Task>,
    pub settings: Settings,
    pub stats: Stats,
}

impl Plan {
    pub fn new(tasks: Vec<Task>, settings: Settings) -> Self {
        Self {
            tasks,
            settings,
            stats: Stats::default(),
        }
    }

    pub fn task(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: u32) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn tasks_on(&self, date: Date) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(move |task| task.assigned_date == Some(date))
    }
}
