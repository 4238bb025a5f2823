use std::fmt;
use std::pin::pin;

use async_channel::{Receiver, Sender};
use futures::StreamExt;
use futures::future::{self, Either};
use geokit_location::{PositionSource, PositionUpdate, WatchId, WatchSubscription};
use geokit_notification::NotificationSink;
use geokit_permission::{PermissionGate, PermissionStatus};
use log::{debug, info, warn};

use crate::{LocationReading, ScreenConfig, ScreenPhase, ScreenState, ScreenView};

/// Something the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Fetch a single position.
    FetchOnce,
    /// Start continuous updates.
    StartUpdates,
    /// Stop continuous updates.
    StopUpdates,
}

/// What became of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Outcome {
    /// The transition ran.
    Applied,
    /// Location access was refused; nothing changed.
    PermissionRefused,
    /// The intent is not allowed in this phase; nothing changed.
    Ignored(ScreenPhase),
}

enum Event {
    Intent(Intent),
    Update(PositionUpdate),
    SubscriptionEnded,
    Closed,
}

/// The location screen.
///
/// All transitions go through `&mut self`, so there is exactly one writer.
/// Every transition replaces the whole [`ScreenState`] and publishes the new
/// snapshot to observers registered with [`LocationScreen::observe`].
pub struct LocationScreen<G, S, N>
where
    G: PermissionGate,
    S: PositionSource,
    N: NotificationSink,
{
    gate: G,
    source: S,
    sink: N,
    config: ScreenConfig,
    state: ScreenState,
    subscription: Option<WatchSubscription>,
    observers: Vec<Sender<ScreenState>>,
}

impl<G, S, N> fmt::Debug for LocationScreen<G, S, N>
where
    G: PermissionGate,
    S: PositionSource,
    N: NotificationSink,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationScreen")
            .field("state", &self.state)
            .field("subscription", &self.subscription)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<G, S, N> LocationScreen<G, S, N>
where
    G: PermissionGate,
    S: PositionSource,
    N: NotificationSink,
{
    /// Create an idle screen with the default configuration.
    pub fn new(gate: G, source: S, sink: N) -> Self {
        Self::with_config(gate, source, sink, ScreenConfig::default())
    }

    /// Create an idle screen.
    pub fn with_config(gate: G, source: S, sink: N, config: ScreenConfig) -> Self {
        Self {
            gate,
            source,
            sink,
            config,
            state: ScreenState::default(),
            subscription: None,
            observers: Vec::new(),
        }
    }

    /// The current snapshot.
    pub const fn state(&self) -> &ScreenState {
        &self.state
    }

    /// The current projection onto the screen's controls.
    pub fn view(&self) -> ScreenView {
        self.state.view()
    }

    /// The displayed text.
    pub fn render(&self) -> String {
        self.state.render()
    }

    /// The handle of the live subscription, if any.
    pub fn watch_id(&self) -> Option<&WatchId> {
        self.subscription.as_ref().map(|subscription| &subscription.id)
    }

    /// Receive every future snapshot, starting with the current one.
    pub fn observe(&mut self) -> Receiver<ScreenState> {
        let (sender, receiver) = async_channel::unbounded();
        if sender.try_send(self.state.clone()).is_ok() {
            self.observers.push(sender);
        }
        receiver
    }

    fn update_state(&mut self, change: impl FnOnce(&mut ScreenState)) {
        let mut next = self.state.clone();
        change(&mut next);
        self.state = next;

        let state = &self.state;
        self.observers
            .retain(|observer| observer.try_send(state.clone()).is_ok());
    }

    /// Make sure location access is granted, prompting if needed.
    ///
    /// Resolves to `false` on refusal or platform failure, after showing a
    /// toast explaining why.
    pub async fn request_permission(&self) -> bool {
        let permission = self.config.permission;
        let host = self.gate.host();
        if !host.enforces_runtime_permission() {
            return true;
        }

        match self.gate.check(permission).await {
            Ok(PermissionStatus::Granted) => return true,
            Ok(status) => debug!("{permission:?} is {status:?} on {host:?}, prompting"),
            Err(err) => {
                warn!("checking {permission:?} failed: {err}");
                self.toast(&self.config.messages.failed);
                return false;
            }
        }

        match self.gate.request(permission).await {
            Ok(PermissionStatus::Granted) => true,
            Ok(PermissionStatus::Denied) => {
                self.toast(&self.config.messages.denied);
                false
            }
            Ok(PermissionStatus::DeniedPermanently) => {
                self.toast(&self.config.messages.revoked);
                false
            }
            Ok(status) => {
                debug!("{permission:?} request ended as {status:?}");
                false
            }
            Err(err) => {
                warn!("requesting {permission:?} failed: {err}");
                self.toast(&self.config.messages.failed);
                false
            }
        }
    }

    fn toast(&self, message: &str) {
        self.sink.show(message, self.config.toast_duration);
    }

    /// Fetch a single position into the slot.
    ///
    /// Only allowed while idle. `loading` is published before the platform is
    /// asked and cleared once it answers, whatever the answer.
    pub async fn fetch_once(&mut self) -> Outcome {
        if self.state.phase != ScreenPhase::Idle {
            debug!("fetch ignored while {:?}", self.state.phase);
            return Outcome::Ignored(self.state.phase);
        }
        if !self.request_permission().await {
            return Outcome::PermissionRefused;
        }

        self.update_state(|state| state.phase = ScreenPhase::Fetching);
        let update = self.source.current_position(&self.config.one_shot).await;
        debug!("one-shot result: {update:?}");

        self.update_state(|state| {
            state.phase = ScreenPhase::Idle;
            state.location = Some(update.into());
        });
        Outcome::Applied
    }

    /// Subscribe to continuous updates.
    ///
    /// Only allowed while idle. Tracking is published before subscribing. If
    /// the platform refuses, its error lands in the slot and the screen goes
    /// back to idle.
    pub async fn start_continuous_updates(&mut self) -> Outcome {
        if self.state.phase != ScreenPhase::Idle {
            debug!("start ignored while {:?}", self.state.phase);
            return Outcome::Ignored(self.state.phase);
        }
        if !self.request_permission().await {
            return Outcome::PermissionRefused;
        }

        self.update_state(|state| state.phase = ScreenPhase::Tracking);
        match self.source.watch_position(&self.config.watch) {
            Ok(subscription) => {
                info!("tracking started ({})", subscription.id);
                self.subscription = Some(subscription);
            }
            Err(err) => {
                warn!("platform refused to start tracking: {err}");
                self.update_state(|state| {
                    state.phase = ScreenPhase::Idle;
                    state.location = Some(LocationReading::Error(err));
                });
            }
        }
        Outcome::Applied
    }

    /// Cancel the live subscription. A no-op when not tracking.
    pub fn stop_continuous_updates(&mut self) -> Outcome {
        let Some(WatchSubscription { id, updates }) = self.subscription.take() else {
            return Outcome::Ignored(self.state.phase);
        };

        drop(updates);
        info!("tracking stopped ({id})");
        self.source.clear_watch(id);
        self.update_state(|state| state.phase = ScreenPhase::Idle);
        Outcome::Applied
    }

    fn apply_update(&mut self, update: PositionUpdate) {
        debug!("tracking update: {update:?}");
        self.update_state(|state| state.location = Some(update.into()));
    }

    fn end_subscription(&mut self) {
        if let Some(WatchSubscription { id, .. }) = self.subscription.take() {
            warn!("platform ended {id} on its own");
            self.source.clear_watch(id);
            self.update_state(|state| state.phase = ScreenPhase::Idle);
        }
    }

    /// Wait for the next subscription emission and apply it.
    ///
    /// Returns `false` without waiting when not tracking, and `false` when
    /// the platform ends the subscription (the screen then goes idle).
    pub async fn pump(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        match subscription.updates.next().await {
            Some(update) => {
                self.apply_update(update);
                true
            }
            None => {
                self.end_subscription();
                false
            }
        }
    }

    /// Carry out one intent.
    pub async fn handle(&mut self, intent: Intent) -> Outcome {
        match intent {
            Intent::FetchOnce => self.fetch_once().await,
            Intent::StartUpdates => self.start_continuous_updates().await,
            Intent::StopUpdates => self.stop_continuous_updates(),
        }
    }

    async fn next_event(&mut self, intents: &Receiver<Intent>) -> Event {
        let subscription = self.subscription.as_mut();
        let update = pin!(async move {
            match subscription {
                Some(subscription) => match subscription.updates.next().await {
                    Some(update) => Event::Update(update),
                    None => Event::SubscriptionEnded,
                },
                None => future::pending().await,
            }
        });
        let intent = pin!(async {
            match intents.recv().await {
                Ok(intent) => Event::Intent(intent),
                Err(_) => Event::Closed,
            }
        });

        // Intents first: a pending stop wins over queued updates.
        match future::select(intent, update).await {
            Either::Left((event, _)) | Either::Right((event, _)) => event,
        }
    }

    /// Process intents and subscription emissions one at a time until the
    /// intent channel closes, then stop tracking.
    pub async fn run(&mut self, intents: Receiver<Intent>) {
        loop {
            match self.next_event(&intents).await {
                Event::Intent(intent) => {
                    let outcome = self.handle(intent).await;
                    debug!("{intent:?} -> {outcome:?}");
                }
                Event::Update(update) => self.apply_update(update),
                Event::SubscriptionEnded => self.end_subscription(),
                Event::Closed => break,
            }
        }

        let _ = self.stop_continuous_updates();
    }
}

impl<G, S, N> Drop for LocationScreen<G, S, N>
where
    G: PermissionGate,
    S: PositionSource,
    N: NotificationSink,
{
    fn drop(&mut self) {
        if let Some(WatchSubscription { id, .. }) = self.subscription.take() {
            self.source.clear_watch(id);
        }
    }
}
