//! Linux location implementation using the GeoClue2 D-Bus service.
//!
//! GeoClue only pushes fixes through D-Bus signals, so continuous updates are
//! produced by re-reading the client's current location at the target
//! interval. The one-shot path keeps the last fix around to honor
//! `max_cached_age_ms`.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{self, Either};
use futures::stream;
use futures_timer::Delay;
use log::{debug, info};
use zbus::Connection;
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedObjectPath;

use crate::{
    Coords, OneShotOptions, Position, PositionError, PositionSource, PositionUpdate, WatchId,
    WatchOptions, WatchSubscription, now_millis,
};

const DESKTOP_ID: &str = "geokit";
/// `GCLUE_ACCURACY_LEVEL_EXACT`.
const ACCURACY_EXACT: u32 = 8;
/// `GCLUE_ACCURACY_LEVEL_STREET`.
const ACCURACY_STREET: u32 = 6;
/// GeoClue reports "/" until the first fix arrives.
const NO_LOCATION: &str = "/";
const FIX_POLL: Duration = Duration::from_millis(250);
/// Lower bound on how long a watch tick waits for GeoClue.
const WATCH_FIX_TIMEOUT: Duration = Duration::from_secs(15);

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Manager",
    default_service = "org.freedesktop.GeoClue2",
    default_path = "/org/freedesktop/GeoClue2/Manager"
)]
trait Manager {
    fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Client",
    default_service = "org.freedesktop.GeoClue2"
)]
trait Client {
    fn start(&self) -> zbus::Result<()>;

    fn stop(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn location(&self) -> zbus::Result<OwnedObjectPath>;

    #[zbus(property)]
    fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn set_requested_accuracy_level(&self, level: u32) -> zbus::Result<()>;

    #[zbus(property)]
    fn set_distance_threshold(&self, meters: u32) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Location",
    default_service = "org.freedesktop.GeoClue2"
)]
trait Fix {
    #[zbus(property)]
    fn latitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn longitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn accuracy(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn altitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn speed(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn heading(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn timestamp(&self) -> zbus::Result<(u64, u64)>;
}

fn dbus_error(context: &'static str) -> impl FnOnce(zbus::Error) -> PositionError {
    move |e| PositionError::unavailable(format!("{context}: {e}"))
}

/// GeoClue marks unknown values with negative sentinels.
fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v >= 0.0)
}

/// Read one fix through a fresh GeoClue client.
async fn read_fix(high_accuracy: bool, distance_threshold_m: f64) -> PositionUpdate {
    let connection = Connection::system()
        .await
        .map_err(dbus_error("D-Bus connection failed"))?;

    let client_path = ManagerProxy::new(&connection)
        .await
        .map_err(dbus_error("GeoClue2 not available"))?
        .get_client()
        .await
        .map_err(dbus_error("GeoClue2 refused a client"))?;

    let client = ClientProxy::builder(&connection)
        .path(client_path)
        .map_err(dbus_error("invalid client path"))?
        .cache_properties(CacheProperties::No)
        .build()
        .await
        .map_err(dbus_error("GeoClue2 client unavailable"))?;

    client
        .set_desktop_id(DESKTOP_ID)
        .await
        .map_err(dbus_error("failed to set desktop id"))?;
    let level = if high_accuracy {
        ACCURACY_EXACT
    } else {
        ACCURACY_STREET
    };
    client
        .set_requested_accuracy_level(level)
        .await
        .map_err(dbus_error("failed to set accuracy level"))?;
    // Threshold is whole meters; fractions round down.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let threshold = distance_threshold_m.max(0.0) as u32;
    client
        .set_distance_threshold(threshold)
        .await
        .map_err(dbus_error("failed to set distance threshold"))?;
    client
        .start()
        .await
        .map_err(dbus_error("failed to start GeoClue client"))?;

    let fix = loop {
        let path = client
            .location()
            .await
            .map_err(dbus_error("failed to read location"))?;
        if path.as_str() != NO_LOCATION {
            break path;
        }
        Delay::new(FIX_POLL).await;
    };

    let location = FixProxy::builder(&connection)
        .path(fix)
        .map_err(dbus_error("invalid location path"))?
        .cache_properties(CacheProperties::No)
        .build()
        .await
        .map_err(dbus_error("location object unavailable"))?;

    let latitude = location
        .latitude()
        .await
        .map_err(dbus_error("failed to read latitude"))?;
    let longitude = location
        .longitude()
        .await
        .map_err(dbus_error("failed to read longitude"))?;
    let accuracy = location
        .accuracy()
        .await
        .map_err(dbus_error("failed to read accuracy"))?;

    let coords = Coords {
        // Below the Dead Sea means "unknown".
        altitude: location.altitude().await.ok().filter(|a| *a > -1_000.0),
        heading: known(location.heading().await.ok()),
        speed: known(location.speed().await.ok()),
        ..Coords::new(latitude, longitude, accuracy)
    };
    let timestamp = location
        .timestamp()
        .await
        .map(|(secs, micros)| secs * 1_000 + micros / 1_000)
        .unwrap_or_else(|_| now_millis());

    if let Err(err) = client.stop().await {
        debug!("failed to stop GeoClue client: {err}");
    }

    Ok(Position::new(coords, timestamp))
}

async fn with_timeout(timeout: Duration, request: impl Future<Output = PositionUpdate>) -> PositionUpdate {
    let request = std::pin::pin!(request);
    match future::select(request, Delay::new(timeout)).await {
        Either::Left((update, _)) => update,
        Either::Right(((), _)) => Err(PositionError::timeout()),
    }
}

/// Position source backed by GeoClue2.
#[derive(Debug, Default)]
pub struct SystemPositionSource {
    last_fix: Arc<Mutex<Option<Position>>>,
    next_watch: AtomicU64,
    live_watches: Arc<Mutex<HashSet<u64>>>,
}

impl SystemPositionSource {
    /// Create the source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cached_fix(&self, max_age_ms: u64) -> Option<Position> {
        let guard = self.last_fix.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|fix| fix.age_at(now_millis()) <= max_age_ms)
            .cloned()
    }
}

struct WatchState {
    id: u64,
    options: WatchOptions,
    live: Arc<Mutex<HashSet<u64>>>,
    last_fix: Arc<Mutex<Option<Position>>>,
    last_reported: Option<Coords>,
    first: bool,
}

impl WatchState {
    fn is_live(&self) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&self.id)
    }

    async fn next_update(&mut self) -> Option<PositionUpdate> {
        loop {
            if !self.first {
                Delay::new(self.options.target_interval()).await;
            }
            self.first = false;

            if !self.is_live() {
                return None;
            }

            let fix = with_timeout(
                self.options.target_interval().max(WATCH_FIX_TIMEOUT),
                read_fix(self.options.high_accuracy, self.options.min_distance_filter_m),
            )
            .await;
            let position = match fix {
                Ok(position) => position,
                Err(err) => return Some(Err(err)),
            };

            if !self
                .options
                .passes_distance_filter(self.last_reported.as_ref(), &position.coords)
            {
                continue;
            }

            self.last_reported = Some(position.coords.clone());
            *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(position.clone());
            return Some(Ok(position));
        }
    }
}

impl PositionSource for SystemPositionSource {
    async fn current_position(&self, options: &OneShotOptions) -> PositionUpdate {
        if let Some(fix) = self.cached_fix(options.max_cached_age_ms) {
            debug!("serving cached fix from {}", fix.timestamp);
            return Ok(fix);
        }

        let position = with_timeout(
            options.timeout(),
            read_fix(options.high_accuracy, options.min_distance_filter_m),
        )
        .await?;

        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(position.clone());
        Ok(position)
    }

    fn watch_position(&self, options: &WatchOptions) -> Result<WatchSubscription, PositionError> {
        let id = self.next_watch.fetch_add(1, Ordering::Relaxed);
        self.live_watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        info!("GeoClue watch {id} started");

        let state = WatchState {
            id,
            options: *options,
            live: Arc::clone(&self.live_watches),
            last_fix: Arc::clone(&self.last_fix),
            last_reported: None,
            first: true,
        };

        let updates = stream::unfold(state, |mut state| async move {
            let update = state.next_update().await?;
            Some((update, state))
        });

        Ok(WatchSubscription {
            id: WatchId::new(id),
            updates: Box::pin(updates),
        })
    }

    fn clear_watch(&self, id: WatchId) {
        let removed = self
            .live_watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.raw());
        if removed {
            info!("GeoClue watch {} cleared", id.raw());
        }
    }
}
