mod profile;
mod task;
mod theme;

pub use profile::UserProfile;
pub use task::{DEFAULT_SUBJECT, Priority, Task, TaskDraft, TaskStatus, parse_deadline};
pub use theme::{Theme, canonical_theme_name};
