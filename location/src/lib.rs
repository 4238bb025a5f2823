//! One-shot and continuous position access.
//!
//! [`PositionSource`] is the seam between an app and the platform location
//! service. [`SystemPositionSource`] implements it on top of GeoClue2 (Linux),
//! the WinRT `Geolocator` (Windows) and a host-provided JNI bridge (Android).
//!
//! Positions and errors serialize to the same camelCase shape the platform
//! services report, so they can be shown to the user as-is.

#![warn(missing_docs)]

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::Stream;
use serde::{Deserialize, Serialize};

mod options;
/// Platform-specific implementations.
pub mod sys;

pub use options::{OneShotOptions, WatchOptions};
pub use sys::SystemPositionSource;

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Coordinates of a position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coords {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Vertical accuracy in meters, if available.
    pub altitude_accuracy: Option<f64>,
    /// Direction of travel in degrees clockwise from true north, if available.
    pub heading: Option<f64>,
    /// Ground speed in meters per second, if available.
    pub speed: Option<f64>,
}

impl Coords {
    /// Coordinates with only the horizontal components known.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A position fix reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Where the device is.
    pub coords: Coords,
    /// When the fix was taken, as Unix epoch milliseconds.
    pub timestamp: u64,
    /// Whether the platform flagged the fix as coming from a mock provider.
    #[serde(default)]
    pub mocked: bool,
}

impl Position {
    /// A position taken at `timestamp`.
    #[must_use]
    pub const fn new(coords: Coords, timestamp: u64) -> Self {
        Self {
            coords,
            timestamp,
            mocked: false,
        }
    }

    /// Milliseconds elapsed between this fix and `now`.
    #[must_use]
    pub const fn age_at(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }
}

/// Current time as Unix epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Numeric error codes reported alongside a [`PositionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum PositionErrorCode {
    /// Location permission is missing.
    PermissionDenied,
    /// No provider could produce a fix.
    PositionUnavailable,
    /// The request did not complete in time.
    Timeout,
    /// Google Play services are missing or outdated.
    PlayServiceNotAvailable,
    /// Location settings do not satisfy the request.
    SettingsNotSatisfied,
    /// Any other platform failure.
    InternalError,
}

impl PositionErrorCode {
    /// The numeric value of this code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
            Self::PlayServiceNotAvailable => 4,
            Self::SettingsNotSatisfied => 5,
            Self::InternalError => -1,
        }
    }
}

impl From<PositionErrorCode> for i32 {
    fn from(code: PositionErrorCode) -> Self {
        code.as_i32()
    }
}

/// A numeric code with no matching [`PositionErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown position error code {0}")]
pub struct UnknownErrorCode(pub i32);

impl TryFrom<i32> for PositionErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::PermissionDenied),
            2 => Ok(Self::PositionUnavailable),
            3 => Ok(Self::Timeout),
            4 => Ok(Self::PlayServiceNotAvailable),
            5 => Ok(Self::SettingsNotSatisfied),
            -1 => Ok(Self::InternalError),
            other => Err(UnknownErrorCode(other)),
        }
    }
}

/// A platform failure to produce a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {})", .code.as_i32())]
pub struct PositionError {
    /// What went wrong.
    pub code: PositionErrorCode,
    /// Platform-supplied description.
    pub message: String,
}

impl PositionError {
    /// Create an error with the given code and message.
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The request ran past its timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(PositionErrorCode::Timeout, "Location request timed out")
    }

    /// No fix could be produced.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(PositionErrorCode::PositionUnavailable, message)
    }

    /// Any other platform failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(PositionErrorCode::InternalError, message)
    }
}

/// Either a fix or the error reported in its place.
pub type PositionUpdate = Result<Position, PositionError>;

/// A boxed stream of position updates.
pub type PositionStream = Pin<Box<dyn Stream<Item = PositionUpdate> + Send>>;

/// Identifies a continuous subscription.
///
/// Neither `Clone` nor `Copy`: the id is consumed by
/// [`PositionSource::clear_watch`], so a subscription can be cancelled once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
    /// Wrap a backend-assigned identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-assigned identifier.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

/// An open continuous subscription.
pub struct WatchSubscription {
    /// Handle used to cancel the subscription.
    pub id: WatchId,
    /// Positions and errors in delivery order.
    pub updates: PositionStream,
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A platform location service.
pub trait PositionSource {
    /// Resolve a single position.
    fn current_position(
        &self,
        options: &OneShotOptions,
    ) -> impl Future<Output = PositionUpdate> + Send;

    /// Open a continuous subscription.
    ///
    /// # Errors
    /// Returns a [`PositionError`] if the platform refuses to start updates.
    fn watch_position(&self, options: &WatchOptions) -> Result<WatchSubscription, PositionError>;

    /// Cancel a subscription. Its stream ends and no further items arrive.
    fn clear_watch(&self, id: WatchId);
}

impl<T: PositionSource + Send + Sync> PositionSource for Arc<T> {
    fn current_position(
        &self,
        options: &OneShotOptions,
    ) -> impl Future<Output = PositionUpdate> + Send {
        (**self).current_position(options)
    }

    fn watch_position(&self, options: &WatchOptions) -> Result<WatchSubscription, PositionError> {
        (**self).watch_position(options)
    }

    fn clear_watch(&self, id: WatchId) {
        (**self).clear_watch(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_serializes_in_camel_case() {
        let mut coords = Coords::new(48.8566, 2.3522, 5.0);
        coords.altitude_accuracy = Some(3.0);
        let value = serde_json::to_value(Position::new(coords, 1_700_000_000_000)).unwrap();

        assert_eq!(value["coords"]["latitude"], 48.8566);
        assert_eq!(value["coords"]["altitudeAccuracy"], 3.0);
        assert!(value["coords"]["heading"].is_null());
        assert_eq!(value["timestamp"], 1_700_000_000_000_u64);
        assert_eq!(value["mocked"], false);
    }

    #[test]
    fn error_code_is_numeric_on_the_wire() {
        let value = serde_json::to_value(PositionError::timeout()).unwrap();
        assert_eq!(value["code"], 3);

        let parsed: PositionError =
            serde_json::from_str(r#"{"code":-1,"message":"boom"}"#).unwrap();
        assert_eq!(parsed.code, PositionErrorCode::InternalError);

        assert!(serde_json::from_str::<PositionError>(r#"{"code":42,"message":"?"}"#).is_err());
    }

    #[test]
    fn error_display_includes_code() {
        assert_eq!(
            PositionError::unavailable("no provider").to_string(),
            "no provider (code 2)"
        );
    }

    #[test]
    fn distance_between_paris_and_london() {
        let paris = Coords::new(48.8566, 2.3522, 0.0);
        let london = Coords::new(51.5074, -0.1278, 0.0);
        let km = paris.distance_to(&london) / 1000.0;
        assert!((km - 343.5).abs() < 2.0, "got {km} km");
        assert!(paris.distance_to(&paris).abs() < f64::EPSILON);
    }

    #[test]
    fn age_saturates_for_future_fixes() {
        let position = Position::new(Coords::new(0.0, 0.0, 1.0), 10_000);
        assert_eq!(position.age_at(12_500), 2_500);
        assert_eq!(position.age_at(5_000), 0);
    }
}
