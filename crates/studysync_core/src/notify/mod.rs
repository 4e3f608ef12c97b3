use crate::error::AppError;
use tracing::warn;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const APP_TITLE: &str = "StudySync";

/// Short user-facing messages raised by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    TaskAdded,
    TaskDeleted,
    TaskCompleted,
    FocusComplete,
    BreakOver,
    Validation(String),
    WelcomeBack(String),
    AccountCreated(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::TaskAdded => "Task added!".to_string(),
            Self::TaskDeleted => "Task deleted".to_string(),
            Self::TaskCompleted => "Task completed!".to_string(),
            Self::FocusComplete => "Focus session complete! Time for a break.".to_string(),
            Self::BreakOver => "Break over! Ready to focus?".to_string(),
            Self::Validation(message) => message.clone(),
            Self::WelcomeBack(name) => format!("Welcome back, {name}!"),
            Self::AccountCreated(name) => format!("Account created! Welcome, {name}!"),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: &Notice) -> Result<(), AppError> {
        Ok(())
    }
}

/// Fire-and-forget delivery: failures are logged, never returned.
pub fn deliver(notifier: &dyn Notifier, notice: &Notice) {
    if let Err(err) = notifier.notify(notice) {
        warn!(error = %err, notice = ?notice, "notification not delivered");
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var("STUDYSYNC_DISABLE_NOTIFICATIONS").is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
