use crate::error::AppError;
use crate::notify::{APP_TITLE, Notice, Notifier};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        Notification::new()
            .summary(APP_TITLE)
            .body(&notice.message())
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
