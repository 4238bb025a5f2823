//! Hosts without a supported location service.
//!
//! Apps on these hosts supply their own [`PositionSource`](crate::PositionSource);
//! this one reports every request as unavailable.

use crate::{
    OneShotOptions, PositionError, PositionSource, PositionUpdate, WatchId, WatchOptions,
    WatchSubscription,
};

/// Position source that never produces a fix.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPositionSource;

impl SystemPositionSource {
    /// Create the source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn unsupported() -> PositionError {
    PositionError::unavailable("location service not supported on this platform")
}

impl PositionSource for SystemPositionSource {
    async fn current_position(&self, _options: &OneShotOptions) -> PositionUpdate {
        Err(unsupported())
    }

    fn watch_position(&self, _options: &WatchOptions) -> Result<WatchSubscription, PositionError> {
        Err(unsupported())
    }

    fn clear_watch(&self, _id: WatchId) {}
}
