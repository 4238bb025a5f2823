use crate::{NotificationError, Toast};

/// Sink for hosts without a toast mechanism.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToasts;

impl SystemToasts {
    /// Create the sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Always fails with [`NotificationError::NotSupported`].
    ///
    /// # Errors
    /// Always.
    pub fn try_show(&self, _toast: &Toast) -> Result<(), NotificationError> {
        Err(NotificationError::NotSupported)
    }
}
