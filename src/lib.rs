//! # Geokit
//!
//! A single-screen location kit: ask for location access, fetch one position,
//! or follow the device as it moves, across Android, Windows and Linux.
//!
//! ## Features
//!
//! Each layer is behind its own feature:
//!
//! - `permission`: Runtime location permission negotiation.
//! - `location`: One-shot and continuous position access.
//! - `notification`: Short toast messages.
//! - `screen`: The location screen state machine tying the three together.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geokit = { version = "0.1", features = ["screen"] }
//! ```
//!
//! ```rust,ignore
//! use geokit::location::SystemPositionSource;
//! use geokit::notification::SystemToasts;
//! use geokit::permission::SystemPermissionGate;
//! use geokit::screen::LocationScreen;
//!
//! async fn show_where_i_am() {
//!     let mut screen = LocationScreen::new(
//!         SystemPermissionGate::new(),
//!         SystemPositionSource::new(),
//!         SystemToasts::new(),
//!     );
//!     let _ = screen.fetch_once().await;
//!     println!("{}", screen.render());
//! }
//! ```

#[cfg(feature = "location")]
pub use geokit_location as location;

#[cfg(feature = "notification")]
pub use geokit_notification as notification;

#[cfg(feature = "permission")]
pub use geokit_permission as permission;

#[cfg(feature = "screen")]
pub use geokit_screen as screen;
