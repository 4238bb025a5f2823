//! Windows location implementation using the WinRT `Geolocator`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_channel::Sender;
use log::{info, warn};
use windows::Devices::Geolocation::{
    Geocoordinate, Geolocator, PositionAccuracy, PositionChangedEventArgs,
};
use windows::Foundation::{TimeSpan, TypedEventHandler};
use windows::core::Ref;

use crate::{
    Coords, OneShotOptions, Position, PositionError, PositionSource, PositionUpdate, WatchId,
    WatchOptions, WatchSubscription,
};

/// Seconds between 1601-01-01 (`DateTime` epoch) and 1970-01-01.
const FILETIME_UNIX_OFFSET_S: i64 = 11_644_473_600;
/// `DateTime` and `TimeSpan` tick in 100 ns units.
const TICKS_PER_MS: i64 = 10_000;
/// `HRESULT_FROM_WIN32(ERROR_TIMEOUT)`.
#[allow(clippy::cast_possible_wrap)]
const HRESULT_TIMEOUT: i32 = 0x8007_05B4_u32 as i32;

fn winrt_error(err: &windows::core::Error) -> PositionError {
    PositionError::internal(err.message().to_string())
}

fn timeout_or_winrt(err: &windows::core::Error) -> PositionError {
    if err.code().0 == HRESULT_TIMEOUT {
        PositionError::timeout()
    } else {
        winrt_error(err)
    }
}

fn span(ms: u64) -> TimeSpan {
    TimeSpan {
        Duration: i64::try_from(ms).unwrap_or(i64::MAX / TICKS_PER_MS) * TICKS_PER_MS,
    }
}

fn position_from(coordinate: &Geocoordinate) -> PositionUpdate {
    let point = coordinate
        .Point()
        .and_then(|point| point.Position())
        .map_err(|e| winrt_error(&e))?;

    let ticks = coordinate
        .Timestamp()
        .map_err(|e| winrt_error(&e))?
        .UniversalTime;
    let timestamp = ticks / TICKS_PER_MS - FILETIME_UNIX_OFFSET_S * 1_000;

    let coords = Coords {
        altitude: Some(point.Altitude),
        altitude_accuracy: coordinate
            .AltitudeAccuracy()
            .ok()
            .and_then(|a| a.GetDouble().ok()),
        heading: coordinate.Heading().ok().and_then(|h| h.GetDouble().ok()),
        speed: coordinate.Speed().ok().and_then(|s| s.GetDouble().ok()),
        ..Coords::new(
            point.Latitude,
            point.Longitude,
            coordinate.Accuracy().unwrap_or(f64::NAN),
        )
    };

    Ok(Position::new(coords, u64::try_from(timestamp).unwrap_or(0)))
}

fn locator(high_accuracy: bool) -> Result<Geolocator, PositionError> {
    let locator = Geolocator::new().map_err(|e| winrt_error(&e))?;
    let accuracy = if high_accuracy {
        PositionAccuracy::High
    } else {
        PositionAccuracy::Default
    };
    locator
        .SetDesiredAccuracy(accuracy)
        .map_err(|e| winrt_error(&e))?;
    Ok(locator)
}

struct Watch {
    locator: Geolocator,
    token: i64,
}

/// Position source backed by `Windows.Devices.Geolocation`.
#[derive(Default)]
pub struct SystemPositionSource {
    next_watch: AtomicU64,
    watches: Mutex<HashMap<u64, Watch>>,
}

impl std::fmt::Debug for SystemPositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPositionSource").finish_non_exhaustive()
    }
}

impl SystemPositionSource {
    /// Create the source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn forward(sender: &Sender<PositionUpdate>, update: PositionUpdate) {
    if let Err(err) = sender.try_send(update) {
        warn!("dropping position update: {err}");
    }
}

impl PositionSource for SystemPositionSource {
    async fn current_position(&self, options: &OneShotOptions) -> PositionUpdate {
        let locator = locator(options.high_accuracy)?;
        let max_age = if options.force_fresh_fix {
            0
        } else {
            options.max_cached_age_ms
        };

        let position = locator
            .GetGeopositionAsyncWithAgeAndTimeout(span(max_age), span(options.timeout_ms))
            .map_err(|e| winrt_error(&e))?
            .await
            .map_err(|e| timeout_or_winrt(&e))?;

        position_from(&position.Coordinate().map_err(|e| winrt_error(&e))?)
    }

    fn watch_position(&self, options: &WatchOptions) -> Result<WatchSubscription, PositionError> {
        let locator = locator(options.high_accuracy)?;
        locator
            .SetMovementThreshold(options.min_distance_filter_m)
            .and_then(|()| {
                locator.SetReportInterval(u32::try_from(options.target_interval_ms).unwrap_or(u32::MAX))
            })
            .map_err(|e| winrt_error(&e))?;

        let (sender, receiver) = async_channel::unbounded();
        let handler = TypedEventHandler::new(move |_, args: Ref<'_, PositionChangedEventArgs>| {
            let update = args
                .ok()
                .and_then(PositionChangedEventArgs::Position)
                .and_then(|position| position.Coordinate())
                .map_err(|e| winrt_error(&e))
                .and_then(|coordinate| position_from(&coordinate));
            forward(&sender, update);
            Ok(())
        });
        let token = locator
            .PositionChanged(&handler)
            .map_err(|e| winrt_error(&e))?;

        let id = self.next_watch.fetch_add(1, Ordering::Relaxed);
        self.watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Watch { locator, token });
        info!("Geolocator watch {id} started");

        Ok(WatchSubscription {
            id: WatchId::new(id),
            updates: Box::pin(receiver),
        })
    }

    fn clear_watch(&self, id: WatchId) {
        let watch = self
            .watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.raw());

        if let Some(watch) = watch {
            // Dropping the handler closes the sender side of the stream.
            if let Err(err) = watch.locator.RemovePositionChanged(watch.token) {
                warn!("failed to detach Geolocator watch {}: {}", id.raw(), err.message());
            }
            info!("Geolocator watch {} cleared", id.raw());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use futures::FutureExt;
    use windows::core::HRESULT;

    use super::*;
    use crate::PositionErrorCode;

    #[test]
    fn winrt_timeouts_map_to_timeout_code() {
        let err = windows::core::Error::from_hresult(HRESULT(HRESULT_TIMEOUT));
        assert_eq!(timeout_or_winrt(&err).code, PositionErrorCode::Timeout);
    }

    #[test]
    fn one_shot_read_does_not_block_the_caller() {
        let source = SystemPositionSource::new();
        let options = OneShotOptions::default().with_timeout(Duration::from_secs(30));

        let started = Instant::now();
        let _ = source.current_position(&options).now_or_never();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
