use crate::model::{Task, TaskStatus};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use time::{OffsetDateTime, UtcOffset};

pub const DEFAULT_STUDY_HOURS: [f64; 7] = [2.0, 4.0, 1.0, 3.0, 5.0, 2.0, 3.0];
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const BAR_CHART_HEIGHT: f64 = 120.0;

/// Study hours per weekday, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyHours(pub [f64; 7]);

impl Default for StudyHours {
    fn default() -> Self {
        Self(DEFAULT_STUDY_HOURS)
    }
}

impl StudyHours {
    pub fn credit(&mut self, weekday: usize, hours: f64) {
        if let Some(slot) = self.0.get_mut(weekday) {
            *slot = (*slot + hours).max(0.0);
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

/// Index of today's weekday in local time, Monday = 0.
pub fn local_weekday_index() -> usize {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let weekday = OffsetDateTime::now_utc().to_offset(offset).weekday();
    usize::from(weekday.number_days_from_monday())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total: usize,
    pub completed: usize,
}

impl Totals {
    pub fn pending(&self) -> usize {
        self.total - self.completed
    }
}

pub fn totals(tasks: &[Task]) -> Totals {
    Totals {
        total: tasks.len(),
        completed: tasks.iter().filter(|task| task.is_completed()).count(),
    }
}

pub fn total_study_hours(hours: &StudyHours) -> f64 {
    hours.total()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectProgress {
    pub subject: String,
    pub completed: usize,
    pub total: usize,
}

impl SubjectProgress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

/// Groups tasks by subject in order of first appearance.
pub fn subject_breakdown(tasks: &[Task]) -> Vec<SubjectProgress> {
    let mut subjects: Vec<SubjectProgress> = Vec::new();
    for task in tasks {
        let index = match subjects.iter().position(|entry| entry.subject == task.subject) {
            Some(index) => index,
            None => {
                subjects.push(SubjectProgress {
                    subject: task.subject.clone(),
                    completed: 0,
                    total: 0,
                });
                subjects.len() - 1
            }
        };
        let entry = &mut subjects[index];
        entry.total += 1;
        if task.status == TaskStatus::Completed {
            entry.completed += 1;
        }
    }
    subjects
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PieSlices {
    pub done: f64,
    pub pending: f64,
}

impl PieSlices {
    /// Clockwise sweeps for `(done, pending)` starting at `-PI / 2`.
    pub fn arcs(&self) -> [(f64, f64); 2] {
        let start = -PI / 2.0;
        let done_end = start + self.done * 2.0 * PI;
        let pending_end = done_end + self.pending * 2.0 * PI;
        [(start, done_end), (done_end, pending_end)]
    }
}

pub fn completion_ratio_for_pie(done: usize, pending: usize) -> PieSlices {
    let total = match done + pending {
        0 => 1,
        total => total,
    } as f64;
    PieSlices {
        done: done as f64 / total,
        pending: pending as f64 / total,
    }
}

pub fn pie_label(done: usize, pending: usize) -> String {
    format!("{done}/{}", done + pending)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: &'static str,
    pub hours: f64,
    pub height: f64,
    pub today: bool,
}

/// Bars scaled to [`BAR_CHART_HEIGHT`], with the scale floored at one hour.
pub fn weekly_bars(hours: &StudyHours, today: usize) -> Vec<Bar> {
    let max = hours.0.iter().copied().fold(1.0_f64, f64::max);
    hours
        .0
        .iter()
        .enumerate()
        .map(|(index, value)| Bar {
            label: WEEKDAY_LABELS[index],
            hours: *value,
            height: value / max * BAR_CHART_HEIGHT,
            today: index == today,
        })
        .collect()
}
