//! Platform-specific location implementations.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(any(target_os = "android", target_os = "windows", target_os = "linux")))]
mod fallback;

#[cfg(target_os = "android")]
pub use android::SystemPositionSource;

#[cfg(target_os = "windows")]
pub use windows::SystemPositionSource;

#[cfg(target_os = "linux")]
pub use linux::SystemPositionSource;

#[cfg(not(any(target_os = "android", target_os = "windows", target_os = "linux")))]
pub use fallback::SystemPositionSource;
