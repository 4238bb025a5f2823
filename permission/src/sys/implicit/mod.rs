//! Hosts without runtime location prompts.
//!
//! On Linux, location access is mediated by GeoClue2 and sandbox portals,
//! never by an in-app prompt. iOS and macOS are treated the same way: the
//! system asks on first use of the location service itself.

use crate::{HostPlatform, Permission, PermissionError, PermissionGate, PermissionStatus};

/// Permission gate for hosts that grant location access implicitly.
#[derive(Debug, Clone, Copy)]
pub struct SystemPermissionGate {
    host: HostPlatform,
}

impl SystemPermissionGate {
    /// Create a gate for the current host.
    #[must_use]
    pub const fn new() -> Self {
        let host = if cfg!(target_os = "ios") {
            HostPlatform::Ios
        } else {
            HostPlatform::Desktop
        };
        Self { host }
    }
}

impl Default for SystemPermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate for SystemPermissionGate {
    fn host(&self) -> HostPlatform {
        self.host
    }

    async fn check(&self, _permission: Permission) -> Result<PermissionStatus, PermissionError> {
        Ok(PermissionStatus::Granted)
    }

    async fn request(&self, _permission: Permission) -> Result<PermissionStatus, PermissionError> {
        Ok(PermissionStatus::Granted)
    }
}
