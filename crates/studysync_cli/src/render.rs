//! Plain-text views for the terminal.

use studysync_core::app::{Dashboard, Progress};
use studysync_core::config::Palette;
use studysync_core::model::Task;
use studysync_core::stats::{BAR_CHART_HEIGHT, Bar, PieSlices, SubjectProgress};
use studysync_core::timer::{PomodoroTimer, TickSource};
use tabled::settings::Style;
use tabled::{Table, Tabled};

const BAR_WIDTH: usize = 30;
const METER_WIDTH: usize = 20;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Task")]
    name: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Due")]
    due: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            subject: task.subject.clone(),
            priority: task.priority.label(),
            status: task.status.label(),
            due: task.deadline_label().unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub fn task_table(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks yet.".to_string();
    }
    let mut table = Table::new(tasks.iter().map(TaskRow::from));
    table.with(Style::rounded());
    table.to_string()
}

/// Filled/empty meter of `width` cells for a fraction in `[0, 1]`.
fn meter(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn bar_chart(bars: &[Bar], palette: &Palette) -> Vec<String> {
    bars.iter()
        .map(|bar| {
            let cells = meter(bar.height / BAR_CHART_HEIGHT, BAR_WIDTH);
            let line = format!("{} {} {:.1}h", bar.label, cells, bar.hours);
            if bar.today {
                palette.accentize(&line)
            } else {
                line
            }
        })
        .collect()
}

pub fn completion_line(pie: &PieSlices, label: &str) -> String {
    format!(
        "{} {} completed ({:.0}%)",
        meter(pie.done, METER_WIDTH),
        label,
        pie.done * 100.0
    )
}

pub fn subject_lines(subjects: &[SubjectProgress]) -> Vec<String> {
    let width = subjects
        .iter()
        .map(|entry| entry.subject.chars().count())
        .max()
        .unwrap_or(0);
    subjects
        .iter()
        .map(|entry| {
            format!(
                "{:<width$} {} {}/{} ({}%)",
                entry.subject,
                meter(f64::from(entry.percent()) / 100.0, METER_WIDTH),
                entry.completed,
                entry.total,
                entry.percent(),
            )
        })
        .collect()
}

pub fn dashboard_text(dashboard: &Dashboard, palette: &Palette) -> String {
    let greeting = match &dashboard.student {
        Some(name) => format!("Welcome back, {name}!"),
        None => "Welcome back, Student!".to_string(),
    };

    let mut lines = vec![
        palette.accentize(&greeting),
        palette.mutedize(&format!(
            "\"{}\" - {}",
            dashboard.quote, dashboard.quote_author
        )),
        String::new(),
        format!("Total tasks:     {}", dashboard.totals.total),
        format!("Completed:       {}", dashboard.totals.completed),
        format!("Pending:         {}", dashboard.totals.pending()),
        format!("Study hours:     {}", format_hours(dashboard.study_hours)),
        format!("Pomodoros:       {}", dashboard.total_pomodoros),
        String::new(),
        palette.accentize("Recent tasks"),
    ];

    if dashboard.recent.is_empty() {
        lines.push(palette.mutedize("No tasks yet. Add one to get started!"));
    }
    for task in &dashboard.recent {
        let due = task
            .deadline_label()
            .map(|label| format!(" (due {label})"))
            .unwrap_or_default();
        lines.push(format!(
            "  [{}] {} - {} - {}{}",
            if task.is_completed() { "x" } else { " " },
            task.name,
            task.subject,
            task.priority,
            due
        ));
    }

    lines.join("\n")
}

pub fn progress_text(progress: &Progress, palette: &Palette) -> String {
    let mut lines = vec![palette.accentize("Weekly study hours")];
    lines.extend(bar_chart(&progress.bars, palette));
    lines.push(String::new());
    lines.push(palette.accentize("Task completion"));
    lines.push(completion_line(&progress.pie, &progress.pie_label));
    lines.push(String::new());
    lines.push(palette.accentize("By subject"));
    if progress.subjects.is_empty() {
        lines.push(palette.mutedize("No subjects yet."));
    }
    lines.extend(subject_lines(&progress.subjects));
    lines.join("\n")
}

/// Header shown above a running countdown, e.g. `Session 1 of 4 | ○○○○`.
pub fn timer_header<S: TickSource>(timer: &PomodoroTimer<S>) -> String {
    let dots: String = timer
        .session_dots()
        .iter()
        .map(|done| if *done { '●' } else { '○' })
        .collect();
    format!("{} | {}", timer.session_label(), dots)
}

/// Whole hours print without a fraction.
fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.0}")
    } else {
        format!("{hours:.1}")
    }
}
