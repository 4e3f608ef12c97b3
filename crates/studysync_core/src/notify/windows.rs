use crate::error::AppError;
use crate::notify::{APP_TITLE, Notice, Notifier};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(APP_TITLE)
            .text1(&notice.message())
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
