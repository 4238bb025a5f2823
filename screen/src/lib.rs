//! A single location screen.
//!
//! [`LocationScreen`] mediates between three user intents (fetch once, start
//! tracking, stop tracking) and the platform collaborators that do the real
//! work: a [`PermissionGate`], a [`PositionSource`] and a
//! [`NotificationSink`]. It owns a [`ScreenState`], replaces it wholesale on
//! every transition and publishes each replacement to its observers.
//!
//! ```ignore
//! use geokit_screen::{Intent, LocationScreen};
//!
//! let mut screen = LocationScreen::new(gate, source, toasts);
//! let states = screen.observe();
//! let (intents, inbox) = async_channel::unbounded();
//!
//! intents.send(Intent::FetchOnce).await?;
//! screen.run(inbox).await;
//! ```

#![warn(missing_docs)]

mod config;
mod location_screen;
mod state;

pub use config::{PermissionMessages, ScreenConfig};
pub use location_screen::{Intent, LocationScreen, Outcome};
pub use state::{LocationReading, ScreenPhase, ScreenState, ScreenView, render_reading};

pub use geokit_location::{PositionSource, WatchId};
pub use geokit_notification::{NotificationSink, ToastDuration};
pub use geokit_permission::{HostPlatform, Permission, PermissionGate, PermissionStatus};
