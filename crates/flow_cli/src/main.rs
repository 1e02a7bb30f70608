use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use flow_cli::cli::{Cli, Command, collect_overrides};
use flow_core::calendar::{CalendarCell, format_date, parse_local_date};
use flow_core::config::{self, Config, Palette};
use flow_core::error::AppError;
use flow_core::model::{Settings, Task, WorkingDays};
use flow_core::plan_api;
use flow_core::timer::{SystemClock, Ticker, format_elapsed};
use std::io::{self, BufRead, IsTerminal, Read};
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::{Date, Month};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "FLOW_LOG";

struct Session {
    config: Config,
    palette: Palette,
    /// Stdin carries commands, so it cannot also carry a task list.
    interactive: bool,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Time")]
    time: String,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn status_label(task: &Task) -> &'static str {
    if task.completed { "done" } else { "open" }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn print_task_json(task: &Task) {
    println!("{}", serde_json::json!(task));
}

fn print_day_plain(date: Date, tasks: &[Task], palette: &Palette) {
    let heading = format!("{}, {}", date.weekday(), format_date(date));
    if tasks.is_empty() {
        println!("{}", palette.accentize(&heading));
        println!("{}", palette.mutedize("No tasks for this day."));
        return;
    }

    println!(
        "{} ({})",
        palette.accentize(&heading),
        plural(tasks.len(), "task")
    );
    let rows = tasks.iter().map(|task| DayRow {
        id: task.id,
        text: task.text.clone(),
        status: status_label(task),
        time: format_elapsed(task.time_spent_secs),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_day_json(date: Date, tasks: &[Task]) {
    println!(
        "{}",
        serde_json::json!({
            "date": format_date(date),
            "tasks": tasks,
        })
    );
}

fn calendar_label(cell: &CalendarCell, palette: &Palette) -> String {
    let CalendarCell::Day(day) = cell else {
        return String::new();
    };

    let mut label = day.date.day().to_string();
    let open = day.tasks.iter().filter(|task| !task.completed).count();
    if day.all_completed {
        label.push_str(" ok");
    } else if open > 0 {
        label.push_str(&format!(" ({open})"));
    }

    if day.is_today {
        palette.accentize(&format!("[{label}]"))
    } else if day.is_past && !day.has_tasks {
        palette.mutedize(&label)
    } else {
        label
    }
}

fn print_calendar_plain(year: i32, month: Month, cells: &[CalendarCell], palette: &Palette) {
    println!("{}", palette.accentize(&format!("{month} {year}")));

    let mut builder = Builder::default();
    builder.push_record(["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"].map(String::from));
    for week in cells.chunks(7) {
        let mut row: Vec<String> = week
            .iter()
            .map(|cell| calendar_label(cell, palette))
            .collect();
        row.resize(7, String::new());
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{}",
        palette.mutedize("[n] today, (n) open tasks, ok all tasks done")
    );
}

fn print_calendar_json(year: i32, month: Month, cells: &[CalendarCell]) {
    let days: Vec<serde_json::Value> = cells
        .iter()
        .filter_map(|cell| match cell {
            CalendarCell::Padding => None,
            CalendarCell::Day(day) => Some(serde_json::json!({
                "date": format_date(day.date),
                "isToday": day.is_today,
                "isPast": day.is_past,
                "hasTasks": day.has_tasks,
                "allCompleted": day.all_completed,
                "tasks": day.tasks,
            })),
        })
        .collect();
    let padding = cells
        .iter()
        .take_while(|cell| matches!(cell, CalendarCell::Padding))
        .count();

    println!(
        "{}",
        serde_json::json!({
            "year": year,
            "month": u8::from(month),
            "leadingPadding": padding,
            "days": days,
        })
    );
}

fn parse_month(raw: &str) -> Result<(i32, Month), AppError> {
    let invalid = || AppError::invalid_input(format!("month must be YYYY-MM: {}", raw.trim()));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month
        .parse::<u8>()
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;
    Ok((year, month))
}

fn read_text_file(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))
}

/// Task list text from a file or, outside interactive mode, piped stdin.
fn read_task_text(file: Option<&Path>, session: &Session) -> Result<String, AppError> {
    if let Some(path) = file {
        return read_text_file(path);
    }

    let stdin = io::stdin();
    if session.interactive || stdin.is_terminal() {
        return Err(AppError::invalid_input(
            "tasks are required, pass them as arguments, with --file, or on stdin",
        ));
    }

    let mut text = String::new();
    stdin.lock().read_to_string(&mut text)?;
    Ok(text)
}

fn plan_settings(
    start: Option<&str>,
    end: Option<&str>,
    per_day: Option<u32>,
    days: Option<&str>,
    config: &Config,
) -> Result<Settings, AppError> {
    let start_date = match start {
        Some(raw) => parse_local_date(raw)?,
        None => plan_api::today()?,
    };
    let working_days = match days {
        Some(raw) => WorkingDays::parse_list(raw)?,
        None => config.working_days(),
    };

    if let Some(raw) = end {
        return Ok(Settings::until(
            start_date,
            parse_local_date(raw)?,
            working_days,
        ));
    }

    let per_day = per_day.unwrap_or_else(|| config.tasks_per_day());
    if per_day == 0 {
        return Err(AppError::invalid_input("tasks per day must be positive"));
    }
    Ok(Settings::per_day(start_date, per_day, working_days))
}

fn watch(ticks: Option<u64>, interval_ms: u64, json: bool) -> Result<(), AppError> {
    let mut ticker = Ticker::new(Duration::from_millis(interval_ms));
    if let Some(ticks) = ticks {
        ticker = ticker.with_max_ticks(ticks);
    }

    let mut failure = None;
    let mut idle = false;
    let delivered = ticker.run(&SystemClock, |now| {
        match plan_api::active_elapsed(now) {
            Ok(Some(active)) => {
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "id": active.task.id,
                            "text": active.task.text,
                            "elapsedSecs": active.elapsed_secs,
                        })
                    );
                } else {
                    println!(
                        "{} {}  {}",
                        active.task.id,
                        active.task.text,
                        format_elapsed(active.elapsed_secs)
                    );
                }
                ControlFlow::Continue(())
            }
            Ok(None) => {
                idle = true;
                ControlFlow::Break(())
            }
            Err(err) => {
                failure = Some(err);
                ControlFlow::Break(())
            }
        }
    });
    debug!(ticks = delivered, "watch finished");

    if let Some(err) = failure {
        return Err(err);
    }
    // Only an idle first tick is an error; a timer stopped mid-watch just ends it.
    if idle && delivered == 1 {
        return Err(AppError::invalid_input("no active timer"));
    }
    Ok(())
}

fn run_command(cli: Cli, session: &Session) -> Result<(), AppError> {
    let palette = &session.palette;

    match cli.command {
        Command::Plan {
            tasks,
            file,
            start,
            end,
            per_day,
            days,
        } => {
            if !tasks.is_empty() && file.is_some() {
                return Err(AppError::invalid_input(
                    "pass tasks as arguments or with --file, not both",
                ));
            }
            let text = if tasks.is_empty() {
                read_task_text(file.as_deref(), session)?
            } else {
                tasks.join("\n")
            };
            let settings = plan_settings(
                start.as_deref(),
                end.as_deref(),
                per_day,
                days.as_deref(),
                &session.config,
            )?;

            let plan = plan_api::create_plan(&text, settings)?;
            let first = plan.tasks.iter().filter_map(|task| task.assigned_date).min();
            let last = plan.tasks.iter().filter_map(|task| task.assigned_date).max();

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "tasks": plan.tasks,
                        "settings": plan.settings,
                        "firstDate": first.map(format_date),
                        "lastDate": last.map(format_date),
                    })
                );
            } else {
                println!(
                    "Planned {} from {} to {}.",
                    plural(plan.tasks.len(), "task"),
                    first.map(format_date).unwrap_or_else(|| "-".into()),
                    last.map(format_date).unwrap_or_else(|| "-".into()),
                );
            }
        }
        Command::Day { date } => {
            let date = match date {
                Some(raw) => parse_local_date(&raw)?,
                None => plan_api::open_plan(plan_api::today()?)?.selected_date,
            };
            let tasks = plan_api::tasks_for_date(date)?;
            if cli.json {
                print_day_json(date, &tasks);
            } else {
                print_day_plain(date, &tasks, palette);
            }
        }
        Command::Done { id } => {
            let completion = plan_api::complete_task(id, plan_api::today()?)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "task": completion.task,
                        "streak": completion.streak,
                        "dayFinished": completion.day_finished,
                    })
                );
            } else {
                println!(
                    "Completed task: {} ({})",
                    completion.task.text, completion.task.id
                );
                if completion.day_finished
                    && let Some(date) = completion.task.assigned_date
                {
                    println!(
                        "{}",
                        palette.accentize(&format!("All tasks for {} are done.", format_date(date)))
                    );
                }
                println!("Streak: {}", plural(completion.streak as usize, "day"));
            }
        }
        Command::Move { id } => {
            let task = plan_api::move_task(id)?;
            if cli.json {
                print_task_json(&task);
            } else {
                let date = task.assigned_date.map(format_date).unwrap_or_default();
                println!("Moved task: {} ({}) to {}", task.text, task.id, date);
            }
        }
        Command::Delete { id } => {
            let task = plan_api::delete_task(id)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Deleted task: {} ({})", task.text, task.id);
            }
        }
        Command::Reorder { date, ids } => {
            let date = parse_local_date(&date)?;
            let tasks = plan_api::reorder_day(date, &ids)?;
            if cli.json {
                print_day_json(date, &tasks);
            } else {
                print_day_plain(date, &tasks, palette);
            }
        }
        Command::Edit { file } => {
            let text = read_task_text(file.as_deref(), session)?;
            let plan = plan_api::edit_tasks(&text)?;
            if cli.json {
                println!("{}", serde_json::json!({ "tasks": plan.tasks }));
            } else {
                let done = plan.tasks.iter().filter(|task| task.completed).count();
                println!(
                    "Updated plan: {} ({} already done)",
                    plural(plan.tasks.len(), "task"),
                    done
                );
            }
        }
        Command::Streak => {
            let opened = plan_api::open_plan(plan_api::today()?)?;
            let stats = &opened.plan.stats;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "streak": stats.streak,
                        "lastCompletedDate": stats.last_completed_date.map(format_date),
                    })
                );
            } else {
                println!("Streak: {}", plural(stats.streak as usize, "day"));
            }
        }
        Command::Progress => {
            let progress = plan_api::progress()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "completed": progress.completed,
                        "total": progress.total,
                        "percentage": progress.percentage,
                    })
                );
            } else {
                println!(
                    "{}/{} tasks done ({}%)",
                    progress.completed, progress.total, progress.percentage
                );
            }
        }
        Command::Calendar { month } => {
            let today = plan_api::today()?;
            let (year, month) = match month {
                Some(raw) => parse_month(&raw)?,
                None => (today.year(), today.month()),
            };
            let cells = plan_api::month(year, month, today)?;
            if cli.json {
                print_calendar_json(year, month, &cells);
            } else {
                print_calendar_plain(year, month, &cells, palette);
            }
        }
        Command::Start { id } => {
            let task = plan_api::start_timer(id, time::OffsetDateTime::now_utc())?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Started timer: {} ({})", task.text, task.id);
            }
        }
        Command::Stop => {
            let stopped = plan_api::stop_timer(time::OffsetDateTime::now_utc())?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "task": stopped.task,
                        "elapsedSecs": stopped.elapsed_secs,
                    })
                );
            } else {
                println!(
                    "Stopped timer: {} ({}) at {}",
                    stopped.task.text,
                    stopped.task.id,
                    format_elapsed(stopped.elapsed_secs)
                );
            }
        }
        Command::Watch { ticks, interval_ms } => watch(ticks, interval_ms, cli.json)?,
        Command::Export => {
            let text = plan_api::export_text()?;
            if cli.json {
                println!("{}", serde_json::json!({ "text": text }));
            } else {
                println!("{text}");
            }
        }
        Command::Reset => {
            let removed = plan_api::reset()?;
            if cli.json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else if removed {
                println!("Plan removed.");
            } else {
                println!("No plan to remove.");
            }
        }
    }

    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

/// Loads the config file and applies this invocation's overrides on top.
fn session_for(cli: &Cli, interactive: bool) -> Result<Session, AppError> {
    // Unreadable config files are already reported by the loader.
    let loaded = config::load_config_with_fallback();
    let overrides = collect_overrides(&cli.config_override)?;
    let config = config::merge_overrides(&loaded.config, &overrides);
    let palette = config::palette_for_theme(config.theme.as_deref());
    Ok(Session {
        config,
        palette,
        interactive,
    })
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("flow".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        let result = session_for(&cli, true).and_then(|session| run_command(cli, &session));
        if let Err(err) = result {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    init_logging();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let result = session_for(&cli, false).and_then(|session| run_command(cli, &session));
    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_month, split_command_line};
    use time::Month;

    #[test]
    fn split_command_line_keeps_quoted_words_together() {
        let args = split_command_line(r#"plan "Write intro" draft --per-day 2"#).unwrap();
        assert_eq!(args, vec!["plan", "Write intro", "draft", "--per-day", "2"]);
    }

    #[test]
    fn split_command_line_rejects_open_quote() {
        let err = split_command_line(r#"plan "oops"#).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn parse_month_accepts_year_and_month() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, Month::February));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("February").is_err());
    }
}
