use crate::error::AppError;
use crate::model::{Task, TaskDraft, Theme, UserProfile};
use crate::notify::{self, Notice, Notifier};
use crate::stats::{
    self, Bar, PieSlices, StudyHours, SubjectProgress, Totals, local_weekday_index,
};
use crate::storage::{PersistentStore, StoreKey};
use crate::tasks::{TaskFilter, TaskRepository};
use crate::timer::{PomodoroTimer, TickSource, TimerDurations};
use serde::Serialize;
use std::rc::Rc;
use tracing::info;

const QUOTES: [(&str, &str); 7] = [
    ("The secret of getting ahead is getting started.", "Mark Twain"),
    ("An investment in knowledge pays the best interest.", "Benjamin Franklin"),
    ("Push yourself, because no one else is going to do it for you.", "Anonymous"),
    ("Great things never come from comfort zones.", "Anonymous"),
    ("Don't watch the clock; do what it does. Keep going.", "Sam Levenson"),
    ("Success is the sum of small efforts, repeated day in and day out.", "Robert Collier"),
    ("Believe you can and you're halfway there.", "Theodore Roosevelt"),
];
const RECENT_TASKS: usize = 4;
const FORM_INCOMPLETE: &str = "Please fill in all fields";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub student: Option<String>,
    pub quote: &'static str,
    pub quote_author: &'static str,
    pub totals: Totals,
    pub study_hours: f64,
    pub total_pomodoros: u64,
    pub recent: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub bars: Vec<Bar>,
    pub pie: PieSlices,
    pub pie_label: String,
    pub subjects: Vec<SubjectProgress>,
}

/// Entry point for adapters: turns user actions into repository and store
/// changes and raises the matching notices.
pub struct App {
    store: PersistentStore,
    tasks: TaskRepository,
    notifier: Rc<dyn Notifier>,
}

impl App {
    pub fn open(store: PersistentStore, notifier: Rc<dyn Notifier>) -> Self {
        let tasks = TaskRepository::open(store.clone());
        Self {
            store,
            tasks,
            notifier,
        }
    }

    pub fn tasks(&self) -> &TaskRepository {
        &self.tasks
    }

    /// Builds a timer sharing this app's store and notifier.
    pub fn timer<S: TickSource>(&self, ticker: S, durations: TimerDurations) -> PomodoroTimer<S> {
        PomodoroTimer::new(ticker, self.store.clone(), self.notifier.clone(), durations)
    }

    fn notice(&self, notice: Notice) {
        notify::deliver(self.notifier.as_ref(), &notice);
    }

    fn reject(&self, err: AppError) -> AppError {
        if err.is_validation() {
            self.notice(Notice::Validation(err.message().to_string()));
        }
        err
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task, AppError> {
        let task = self.tasks.add(draft).map_err(|err| self.reject(err))?;
        self.notice(Notice::TaskAdded);
        Ok(task)
    }

    pub fn delete_task(&mut self, id: i64) -> Option<Task> {
        let removed = self.tasks.remove(id);
        if removed.is_some() {
            self.notice(Notice::TaskDeleted);
        }
        removed
    }

    pub fn toggle_task(&mut self, id: i64) -> Option<Task> {
        let toggled = self.tasks.toggle_status(id);
        if toggled.as_ref().is_some_and(Task::is_completed) {
            self.notice(Notice::TaskCompleted);
        }
        toggled
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks.list(filter)
    }

    pub fn study_hours(&self) -> StudyHours {
        self.store.load(StoreKey::StudyHours, StudyHours::default())
    }

    pub fn total_pomodoros(&self) -> u64 {
        self.store.load(StoreKey::PomodoroCounter, 0)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.store.load_optional(StoreKey::UserProfile)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self.reject(AppError::invalid_input(FORM_INCOMPLETE)));
        }

        let profile = UserProfile::from_email(email);
        self.store.save(StoreKey::UserProfile, &profile);
        info!(email = %profile.email, "logged in");
        self.notice(Notice::WelcomeBack(profile.name.clone()));
        Ok(profile)
    }

    pub fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AppError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(self.reject(AppError::invalid_input(FORM_INCOMPLETE)));
        }

        let profile = UserProfile {
            name: name.to_string(),
            email: email.to_string(),
        };
        self.store.save(StoreKey::UserProfile, &profile);
        info!(email = %profile.email, "account created");
        self.notice(Notice::AccountCreated(profile.name.clone()));
        Ok(profile)
    }

    pub fn theme(&self) -> Theme {
        self.store.load(StoreKey::Theme, Theme::default())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Theme {
        self.store.save(StoreKey::Theme, &theme);
        theme
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next)
    }

    pub fn dashboard(&self) -> Dashboard {
        let all = self.tasks.all();
        let (quote, quote_author) = quote_for_day(local_weekday_index());
        Dashboard {
            student: self.profile().map(|profile| profile.name),
            quote,
            quote_author,
            totals: stats::totals(all),
            study_hours: stats::total_study_hours(&self.study_hours()),
            total_pomodoros: self.total_pomodoros(),
            recent: self.tasks.recent(RECENT_TASKS).to_vec(),
        }
    }

    pub fn progress(&self) -> Progress {
        let all = self.tasks.all();
        let totals = stats::totals(all);
        Progress {
            bars: stats::weekly_bars(&self.study_hours(), local_weekday_index()),
            pie: stats::completion_ratio_for_pie(totals.completed, totals.pending()),
            pie_label: stats::pie_label(totals.completed, totals.pending()),
            subjects: stats::subject_breakdown(all),
        }
    }
}

fn quote_for_day(day: usize) -> (&'static str, &'static str) {
    QUOTES[day % QUOTES.len()]
}
