use geokit_location::{OneShotOptions, WatchOptions};
use geokit_notification::ToastDuration;
use geokit_permission::Permission;

/// Texts shown when location access is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMessages {
    /// The user declined this time.
    pub denied: String,
    /// The user declined and asked never to be prompted again.
    pub revoked: String,
    /// The platform failed before the user could answer.
    pub failed: String,
}

impl Default for PermissionMessages {
    fn default() -> Self {
        Self {
            denied: "Location permission denied by user.".to_owned(),
            revoked: "Location permission revoked by user.".to_owned(),
            failed: "Location permission could not be requested.".to_owned(),
        }
    }
}

/// How a [`LocationScreen`](crate::LocationScreen) talks to its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    /// The capability requested before any location access.
    pub permission: Permission,
    /// Options for "fetch once".
    pub one_shot: OneShotOptions,
    /// Options for continuous tracking.
    pub watch: WatchOptions,
    /// Permission refusal texts.
    pub messages: PermissionMessages,
    /// How long refusal toasts stay on screen.
    pub toast_duration: ToastDuration,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            permission: Permission::FineLocation,
            one_shot: OneShotOptions::default(),
            watch: WatchOptions::default(),
            messages: PermissionMessages::default(),
            toast_duration: ToastDuration::Long,
        }
    }
}
