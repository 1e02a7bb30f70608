use crate::model::Task;

/// One task per non-blank line, with an optional `-` or `*` bullet.
pub fn parse_task_list(text: &str) -> Vec<Task> {
    let mut tasks = Vec::new();
    let mut next_id = 1;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task_text = strip_bullet(trimmed).trim();
        if task_text.is_empty() {
            continue;
        }

        tasks.push(Task::new(next_id, task_text));
        next_id += 1;
    }

    tasks
}

fn strip_bullet(line: &str) -> &str {
    match line.strip_prefix(['-', '*']) {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

pub fn tasks_to_text(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|task| format!("- {}", task.text))
        .collect::<Vec<_>>()
        .join("\n")
}
