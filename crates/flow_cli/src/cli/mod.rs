use clap::{Parser, Subcommand};
use flow_core::config::{ConfigOverrides, canonical_theme_name};
use flow_core::error::AppError;
use flow_core::model::WorkingDays;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Spread a task list over your working days", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a plan from a task list, replacing any existing plan
    ///
    /// Example: flow plan "Write intro" "Draft chapter 1" --per-day 2
    /// Example: flow plan --file tasks.txt --end 2024-01-31
    /// Example: cat tasks.txt | flow plan --days 1,2,3,4
    Plan {
        /// One task per argument
        tasks: Vec<String>,
        /// Read the task list from a file, one task per line
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// First day of the plan (YYYY-MM-DD), defaults to today
        #[arg(long, value_name = "DATE")]
        start: Option<String>,
        /// Spread the tasks evenly up to this day (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with = "per_day")]
        end: Option<String>,
        /// Fixed number of tasks per working day
        #[arg(long = "per-day", value_name = "N")]
        per_day: Option<u32>,
        /// Working weekdays, 0 = Sunday through 6 = Saturday
        #[arg(long, value_name = "LIST")]
        days: Option<String>,
    },
    /// Show the tasks of one day
    ///
    /// Example: flow day
    /// Example: flow day 2024-01-03
    Day { date: Option<String> },
    /// Mark a task as completed
    ///
    /// Example: flow done 3
    Done { id: u32 },
    /// Push a task to the next working day
    ///
    /// Example: flow move 3
    Move { id: u32 },
    /// Delete a task
    ///
    /// Example: flow delete 3
    Delete { id: u32 },
    /// Set the order of a day's open tasks
    ///
    /// Example: flow reorder 2024-01-02 4 3 5
    Reorder {
        date: String,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u32>,
    },
    /// Replace the task list and reschedule, keeping completed tasks done
    ///
    /// Example: flow edit --file tasks.txt
    /// Example: flow export > tasks.txt && $EDITOR tasks.txt && flow edit --file tasks.txt
    Edit {
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Show the current streak of fully completed working days
    ///
    /// Example: flow streak
    Streak,
    /// Show how much of the plan is done
    ///
    /// Example: flow progress
    Progress,
    /// Show a month grid of the plan
    ///
    /// Example: flow calendar
    /// Example: flow calendar --month 2024-02
    Calendar {
        #[arg(long, value_name = "YYYY-MM")]
        month: Option<String>,
    },
    /// Start timing a task, stopping any other running timer
    ///
    /// Example: flow start 2
    Start { id: u32 },
    /// Stop the running timer
    ///
    /// Example: flow stop
    Stop,
    /// Print the running timer once per interval
    ///
    /// Example: flow watch
    /// Example: flow watch --ticks 5 --interval-ms 200
    Watch {
        /// Stop after this many updates
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        #[arg(long = "interval-ms", value_name = "MS", default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Print the task list as text
    ///
    /// Example: flow export
    Export,
    /// Remove the stored plan
    ///
    /// Example: flow reset
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    TasksPerDay,
    WorkingDays,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "tasks_per_day" | "per_day" => ConfigOverrideTarget::TasksPerDay,
        "working_days" | "days" => ConfigOverrideTarget::WorkingDays,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` value into one set of overrides. Later
/// values win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry).map_err(|message| {
            AppError::invalid_input(format!("--config-override {entry}: {message}"))
        })?;

        match parsed.target {
            ConfigOverrideTarget::Theme => {
                let theme = canonical_theme_name(&parsed.value).ok_or_else(|| {
                    AppError::invalid_input(format!(
                        "--config-override {entry}: unknown theme, expected plain, ocean or ember"
                    ))
                })?;
                overrides.theme = Some(theme);
            }
            ConfigOverrideTarget::TasksPerDay => {
                let count = parsed
                    .value
                    .parse::<u32>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| {
                        AppError::invalid_input(format!(
                            "--config-override {entry}: tasks per day must be a positive number"
                        ))
                    })?;
                overrides.tasks_per_day = Some(count);
            }
            ConfigOverrideTarget::WorkingDays => {
                overrides.working_days = Some(WorkingDays::parse_list(&parsed.value)?);
            }
        }
    }

    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;
    let mut previous_lowercase = false;

    for ch in name.chars() {
        // camelCase boundary
        if ch.is_ascii_uppercase() && previous_lowercase {
            cleaned.push('_');
        }
        previous_lowercase = ch.is_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
