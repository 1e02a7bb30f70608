use crate::error::AppError;
use crate::model::{Plan, Settings, Stats, Task};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "plan.json";
const STORE_ENV_VAR: &str = "FLOW_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPlan {
    #[serde(default = "default_schema_version")]
    schema_version: u32,
    tasks: Vec<Task>,
    settings: Settings,
    #[serde(default)]
    stats: Stats,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("focusflow")
            .join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("focusflow")
            .join(STORE_FILE_NAME))
    }
}

/// Loads the stored plan, or `None` when nothing has been saved yet.
pub fn load_plan(path: &Path) -> Result<Option<Plan>, AppError> {
    if !path.exists() {
        debug!(path = %path.display(), "no stored plan");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let stored: StoredPlan =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schemaVersion mismatch"));
    }

    if let Some(active_id) = stored.stats.active_task_id {
        let exists = stored.tasks.iter().any(|task| task.id == active_id);
        if !exists {
            return Err(AppError::invalid_data("activeTaskId not found"));
        }
    }

    debug!(path = %path.display(), tasks = stored.tasks.len(), "plan loaded");
    Ok(Some(Plan {
        tasks: stored.tasks,
        settings: stored.settings,
        stats: stored.stats,
    }))
}

/// Like [`load_plan`], but a missing plan is an error.
pub fn require_plan(path: &Path) -> Result<Plan, AppError> {
    load_plan(path)?.ok_or_else(|| AppError::invalid_input("no plan yet, run `flow plan` first"))
}

pub fn save_plan(path: &Path, plan: &Plan) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let stored = StoredPlan {
        schema_version: SCHEMA_VERSION,
        tasks: plan.tasks.clone(),
        settings: plan.settings.clone(),
        stats: plan.stats.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    debug!(path = %path.display(), tasks = plan.tasks.len(), "plan saved");
    Ok(())
}

/// Removes the stored plan. Returns whether there was one.
pub fn clear_plan(path: &Path) -> Result<bool, AppError> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}
