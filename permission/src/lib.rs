//! Runtime location permission negotiation.
//!
//! This crate answers one question for the rest of geokit: may the app read
//! the device location right now? Only Android (API level 23 and newer)
//! enforces an interactive runtime check; every other host is treated as
//! having granted access implicitly.

#![warn(missing_docs)]

use std::future::Future;
use std::sync::Arc;

/// Platform-specific implementations.
pub mod sys;

pub use sys::SystemPermissionGate;

/// Capabilities that can be negotiated through a [`PermissionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Permission {
    /// Precise (GPS-grade) location access.
    FineLocation,
    /// Approximate (network-grade) location access.
    CoarseLocation,
}

impl Permission {
    /// The Android manifest name of this permission.
    #[must_use]
    pub const fn android_name(self) -> &'static str {
        match self {
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Self::CoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
        }
    }
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission was denied, the user may be asked again.
    Denied,
    /// Permission was denied and the user asked never to be prompted again.
    DeniedPermanently,
    /// Permission is restricted by policy (parental controls, MDM).
    Restricted,
    /// Permission has not been requested yet.
    NotDetermined,
}

impl PermissionStatus {
    /// Returns `true` for [`PermissionStatus::Granted`].
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// The host operating system family, as far as permissions are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    /// Android, with its `Build.VERSION.SDK_INT`.
    Android {
        /// The platform API level.
        api_level: u32,
    },
    /// iOS and iPadOS.
    Ios,
    /// Linux, Windows, macOS and anything else without runtime prompts.
    Desktop,
}

impl HostPlatform {
    /// First Android API level with runtime permission prompts (Marshmallow).
    pub const RUNTIME_PERMISSION_API_LEVEL: u32 = 23;

    /// Whether the host requires an explicit runtime check before location
    /// access.
    #[must_use]
    pub const fn enforces_runtime_permission(self) -> bool {
        match self {
            Self::Android { api_level } => api_level >= Self::RUNTIME_PERMISSION_API_LEVEL,
            Self::Ios | Self::Desktop => false,
        }
    }
}

/// Errors that can occur when negotiating permissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The permission type is not supported on this platform.
    #[error("permission not supported on this platform")]
    NotSupported,
    /// The prompt was dismissed without the host delivering a result.
    #[error("permission request abandoned")]
    Abandoned,
    /// An underlying platform call failed.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Access to the host's permission system.
pub trait PermissionGate {
    /// The host platform this gate negotiates with.
    fn host(&self) -> HostPlatform;

    /// Check the current status of a permission without prompting.
    fn check(
        &self,
        permission: Permission,
    ) -> impl Future<Output = Result<PermissionStatus, PermissionError>> + Send;

    /// Prompt the user for a permission.
    ///
    /// Implementations issue exactly one interactive request per call.
    fn request(
        &self,
        permission: Permission,
    ) -> impl Future<Output = Result<PermissionStatus, PermissionError>> + Send;
}

impl<T: PermissionGate + Send + Sync> PermissionGate for Arc<T> {
    fn host(&self) -> HostPlatform {
        (**self).host()
    }

    fn check(
        &self,
        permission: Permission,
    ) -> impl Future<Output = Result<PermissionStatus, PermissionError>> + Send {
        (**self).check(permission)
    }

    fn request(
        &self,
        permission: Permission,
    ) -> impl Future<Output = Result<PermissionStatus, PermissionError>> + Send {
        (**self).request(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_marshmallow_and_newer_prompt() {
        assert!(!HostPlatform::Android { api_level: 22 }.enforces_runtime_permission());
        assert!(HostPlatform::Android { api_level: 23 }.enforces_runtime_permission());
        assert!(HostPlatform::Android { api_level: 34 }.enforces_runtime_permission());
        assert!(!HostPlatform::Ios.enforces_runtime_permission());
        assert!(!HostPlatform::Desktop.enforces_runtime_permission());
    }

    #[test]
    fn fine_location_maps_to_manifest_name() {
        assert_eq!(
            Permission::FineLocation.android_name(),
            "android.permission.ACCESS_FINE_LOCATION"
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn linux_grants_implicitly() {
        let gate = SystemPermissionGate::new();
        assert_eq!(gate.host(), HostPlatform::Desktop);
        assert_eq!(
            gate.check(Permission::FineLocation).await,
            Ok(PermissionStatus::Granted)
        );
        assert_eq!(
            gate.request(Permission::FineLocation).await,
            Ok(PermissionStatus::Granted)
        );
    }
}
