//! Transient toast messages.
//!
//! A toast is a short, non-interactive message that disappears on its own:
//! `android.widget.Toast` on Android, a desktop notification with an expiry
//! everywhere else.

#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

mod sys;

pub use sys::SystemToasts;

/// How long a toast stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToastDuration {
    /// About two seconds.
    #[default]
    Short,
    /// About three and a half seconds.
    Long,
}

impl ToastDuration {
    /// The display time used where the platform takes an explicit timeout.
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        match self {
            Self::Short => Duration::from_millis(2_000),
            Self::Long => Duration::from_millis(3_500),
        }
    }
}

/// A message to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    message: String,
    duration: ToastDuration,
}

impl Toast {
    /// A short toast with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: ToastDuration::Short,
        }
    }

    /// Set how long the toast stays on screen.
    #[must_use]
    pub const fn duration(mut self, duration: ToastDuration) -> Self {
        self.duration = duration;
        self
    }

    /// The message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The display duration.
    #[must_use]
    pub const fn display_duration(&self) -> ToastDuration {
        self.duration
    }
}

/// Errors that can occur when showing a toast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// This platform has no toast mechanism.
    #[error("toasts are not supported on this platform")]
    NotSupported,
    /// The platform refused the toast.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Somewhere to show transient messages.
///
/// Showing is best-effort: failures are the sink's to log, never the
/// caller's to handle.
pub trait NotificationSink {
    /// Show `message` for `duration`.
    fn show(&self, message: &str, duration: ToastDuration);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn show(&self, message: &str, duration: ToastDuration) {
        (**self).show(message, duration);
    }
}

impl NotificationSink for SystemToasts {
    fn show(&self, message: &str, duration: ToastDuration) {
        let toast = Toast::new(message).duration(duration);
        if let Err(err) = self.try_show(&toast) {
            log::warn!("toast {message:?} not shown: {err}");
        }
    }
}
