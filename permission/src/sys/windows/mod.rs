//! Windows permission implementation using WinRT.
//!
//! Windows has no in-app runtime prompt for location, but the user can still
//! switch location access off in Settings. `RequestAccessAsync` reports that
//! switch. The host counts as [`HostPlatform::Desktop`], so the location
//! screen never asks this gate; callers that want the Settings state call it
//! directly.

use windows::Devices::Geolocation::{GeolocationAccessStatus, Geolocator};

use crate::{HostPlatform, Permission, PermissionError, PermissionGate, PermissionStatus};

/// Permission gate backed by `Geolocator::RequestAccessAsync`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPermissionGate;

impl SystemPermissionGate {
    /// Create a gate for the current host.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn platform_error(err: &windows::core::Error) -> PermissionError {
    PermissionError::Platform(err.message().to_string())
}

async fn location_access() -> Result<PermissionStatus, PermissionError> {
    let status = Geolocator::RequestAccessAsync()
        .map_err(|e| platform_error(&e))?
        .await
        .map_err(|e| platform_error(&e))?;

    Ok(match status {
        GeolocationAccessStatus::Allowed => PermissionStatus::Granted,
        // Only the Settings app can lift this one.
        GeolocationAccessStatus::Denied => PermissionStatus::DeniedPermanently,
        _ => PermissionStatus::NotDetermined,
    })
}

impl PermissionGate for SystemPermissionGate {
    fn host(&self) -> HostPlatform {
        HostPlatform::Desktop
    }

    async fn check(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        match permission {
            Permission::FineLocation | Permission::CoarseLocation => location_access().await,
        }
    }

    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        // RequestAccessAsync both checks and requests.
        self.check(permission).await
    }
}
