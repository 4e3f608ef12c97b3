use crate::error::AppError;
use crate::model::{DEFAULT_SUBJECT, Priority, Task, TaskDraft, TaskStatus, parse_deadline};
use crate::storage::{PersistentStore, StoreKey};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

/// Exact-match filter; `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.priority.is_none_or(|priority| task.priority == priority)
            && self.status.is_none_or(|status| task.status == status)
    }
}

/// Ordered task collection, most recently added first, mirrored to the
/// store after every mutation.
pub struct TaskRepository {
    tasks: Vec<Task>,
    store: PersistentStore,
    last_id: i64,
}

impl TaskRepository {
    pub fn open(store: PersistentStore) -> Self {
        let mut repository = Self {
            tasks: Vec::new(),
            store,
            last_id: 0,
        };
        repository.load_all();
        repository
    }

    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, AppError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_input("Task name is required!"));
        }

        let deadline = match draft.deadline.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => {
                parse_deadline(value)?;
                Some(value.to_string())
            }
            _ => None,
        };

        let subject = match draft.subject.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => DEFAULT_SUBJECT.to_string(),
        };

        let now = OffsetDateTime::now_utc();
        let created = now
            .format(&Rfc3339)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;

        let task = Task {
            id: self.next_id(now)?,
            name: name.to_string(),
            subject,
            deadline,
            priority: draft.priority,
            status: draft.status,
            created,
        };

        self.tasks.insert(0, task.clone());
        self.save_all();
        info!(id = task.id, subject = %task.subject, "task added");

        Ok(task)
    }

    /// Removes the task if present. Unknown ids are ignored.
    pub fn remove(&mut self, id: i64) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id);
        let removed = index.map(|index| self.tasks.remove(index));
        self.save_all();
        match &removed {
            Some(task) => info!(id = task.id, "task removed"),
            None => debug!(id, "remove ignored, no such task"),
        }
        removed
    }

    /// Flips `Pending` and `Completed`, returning the updated task.
    pub fn toggle_status(&mut self, id: i64) -> Option<Task> {
        let updated = self.tasks.iter_mut().find(|task| task.id == id).map(|task| {
            task.status = task.status.toggled();
            task.clone()
        });
        if let Some(task) = &updated {
            self.save_all();
            info!(id = task.id, status = %task.status, "task toggled");
        } else {
            debug!(id, "toggle ignored, no such task");
        }
        updated
    }

    pub fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn recent(&self, count: usize) -> &[Task] {
        &self.tasks[..count.min(self.tasks.len())]
    }

    pub fn save_all(&self) -> bool {
        self.store.save(StoreKey::Tasks, &self.tasks)
    }

    /// Replaces the in-memory collection with the stored one.
    pub fn load_all(&mut self) {
        self.tasks = self.store.load(StoreKey::Tasks, Vec::new());
        let highest = self.tasks.iter().map(|task| task.id).max().unwrap_or(0);
        self.last_id = self.last_id.max(highest);
        debug!(count = self.tasks.len(), "tasks loaded");
    }

    fn next_id(&mut self, now: OffsetDateTime) -> Result<i64, AppError> {
        let millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
        let after_last = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| AppError::invalid_data("no task ids left above the stored ones"))?;
        self.last_id = millis.max(after_last);
        Ok(self.last_id)
    }
}
