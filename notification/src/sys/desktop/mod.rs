use notify_rust::{Notification as NrNotification, Timeout};

use crate::{NotificationError, Toast};

const APP_NAME: &str = "geokit";

fn display_ms(toast: &Toast) -> u32 {
    u32::try_from(toast.display_duration().as_duration().as_millis()).unwrap_or(u32::MAX)
}

/// Toasts rendered as expiring desktop notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToasts;

impl SystemToasts {
    /// Create the sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Show a toast, reporting failures.
    ///
    /// # Errors
    /// Returns a [`NotificationError`] if the notification server rejects it.
    pub fn try_show(&self, toast: &Toast) -> Result<(), NotificationError> {
        NrNotification::new()
            .appname(APP_NAME)
            .summary(APP_NAME)
            .body(toast.message())
            .timeout(Timeout::Milliseconds(display_ms(toast)))
            .show()
            .map(drop)
            .map_err(|e| NotificationError::Platform(e.to_string()))
    }
}
