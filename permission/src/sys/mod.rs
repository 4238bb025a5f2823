//! Platform-specific permission implementations.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(any(target_os = "android", target_os = "windows")))]
mod implicit;

#[cfg(target_os = "android")]
pub use android::SystemPermissionGate;

#[cfg(target_os = "windows")]
pub use windows::SystemPermissionGate;

#[cfg(not(any(target_os = "android", target_os = "windows")))]
pub use implicit::SystemPermissionGate;
