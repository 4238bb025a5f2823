//! In-memory collaborators for driving a `LocationScreen` in tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender};
use geokit_location::{
    Coords, OneShotOptions, Position, PositionError, PositionSource, PositionUpdate, WatchId,
    WatchOptions, WatchSubscription,
};
use geokit_notification::{NotificationSink, ToastDuration};
use geokit_permission::{
    HostPlatform, Permission, PermissionError, PermissionGate, PermissionStatus,
};
use geokit_screen::{LocationScreen, ScreenState};

pub type TestScreen = LocationScreen<Arc<FakeGate>, Arc<FakeSource>, Arc<FakeSink>>;

pub fn position(latitude: f64, longitude: f64, accuracy: f64) -> Position {
    Position::new(Coords::new(latitude, longitude, accuracy), 1_700_000_000_000)
}

#[derive(Debug)]
pub struct FakeGate {
    host: HostPlatform,
    check: Mutex<Result<PermissionStatus, PermissionError>>,
    request: Mutex<Result<PermissionStatus, PermissionError>>,
    pub checks: AtomicUsize,
    pub requests: AtomicUsize,
}

impl FakeGate {
    /// Android 14, answering `check` and `request` as given.
    pub fn android(
        check: Result<PermissionStatus, PermissionError>,
        request: Result<PermissionStatus, PermissionError>,
    ) -> Arc<Self> {
        Self::on(HostPlatform::Android { api_level: 34 }, check, request)
    }

    pub fn granted() -> Arc<Self> {
        Self::android(Ok(PermissionStatus::Granted), Ok(PermissionStatus::Granted))
    }

    pub fn on(
        host: HostPlatform,
        check: Result<PermissionStatus, PermissionError>,
        request: Result<PermissionStatus, PermissionError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            host,
            check: Mutex::new(check),
            request: Mutex::new(request),
            checks: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        })
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionGate for FakeGate {
    fn host(&self) -> HostPlatform {
        self.host
    }

    async fn check(&self, _permission: Permission) -> Result<PermissionStatus, PermissionError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.check.lock().unwrap().clone()
    }

    async fn request(&self, _permission: Permission) -> Result<PermissionStatus, PermissionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.request.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
pub struct FakeSource {
    answers: Mutex<VecDeque<PositionUpdate>>,
    /// Snapshots the screen published before the platform was asked.
    observer: Mutex<Option<Receiver<ScreenState>>>,
    seen_at_call: Mutex<Option<ScreenState>>,
    refuse_watch: Mutex<Option<PositionError>>,
    next_watch: AtomicU64,
    watches: Mutex<HashMap<u64, Sender<PositionUpdate>>>,
    pub one_shot_options: Mutex<Vec<OneShotOptions>>,
    pub watch_options: Mutex<Vec<WatchOptions>>,
    pub cleared: Mutex<Vec<u64>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answering(update: PositionUpdate) -> Arc<Self> {
        let source = Self::new();
        source.answer(update);
        source
    }

    pub fn answer(&self, update: PositionUpdate) {
        self.answers.lock().unwrap().push_back(update);
    }

    pub fn refuse_watch(&self, error: PositionError) {
        *self.refuse_watch.lock().unwrap() = Some(error);
    }

    pub fn watch_from(&self, observer: Receiver<ScreenState>) {
        *self.observer.lock().unwrap() = Some(observer);
    }

    /// The last snapshot published before `current_position` ran.
    pub fn seen_at_call(&self) -> Option<ScreenState> {
        self.seen_at_call.lock().unwrap().clone()
    }

    /// Emit on a watch as the platform would, even after it was cleared.
    /// Returns whether anyone was still listening.
    pub fn emit(&self, watch: u64, update: PositionUpdate) -> bool {
        let sender = self.watches.lock().unwrap().get(&watch).cloned();
        sender.is_some_and(|sender| sender.try_send(update).is_ok())
    }

    /// End a watch from the platform side.
    pub fn hang_up(&self, watch: u64) {
        self.watches.lock().unwrap().remove(&watch);
    }

    pub fn watches_opened(&self) -> u64 {
        self.next_watch.load(Ordering::SeqCst)
    }

    pub fn cleared(&self) -> Vec<u64> {
        self.cleared.lock().unwrap().clone()
    }
}

impl PositionSource for FakeSource {
    async fn current_position(&self, options: &OneShotOptions) -> PositionUpdate {
        self.one_shot_options.lock().unwrap().push(*options);

        let observer = self.observer.lock().unwrap().clone();
        if let Some(observer) = observer {
            let mut last = None;
            while let Ok(state) = observer.try_recv() {
                last = Some(state);
            }
            *self.seen_at_call.lock().unwrap() = last;
        }

        let answer = self.answers.lock().unwrap().pop_front();
        answer.unwrap_or_else(|| Err(PositionError::unavailable("no scripted answer")))
    }

    fn watch_position(&self, options: &WatchOptions) -> Result<WatchSubscription, PositionError> {
        if let Some(error) = self.refuse_watch.lock().unwrap().take() {
            return Err(error);
        }
        self.watch_options.lock().unwrap().push(*options);

        let id = self.next_watch.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = async_channel::unbounded();
        self.watches.lock().unwrap().insert(id, sender);

        Ok(WatchSubscription {
            id: WatchId::new(id),
            updates: Box::pin(receiver),
        })
    }

    fn clear_watch(&self, id: WatchId) {
        // The sender is kept so tests can emit after cancellation.
        self.cleared.lock().unwrap().push(id.raw());
    }
}

#[derive(Debug, Default)]
pub struct FakeSink {
    shown: Mutex<Vec<(String, ToastDuration)>>,
}

impl FakeSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<(String, ToastDuration)> {
        self.shown.lock().unwrap().clone()
    }
}

impl NotificationSink for FakeSink {
    fn show(&self, message: &str, duration: ToastDuration) {
        self.shown.lock().unwrap().push((message.to_owned(), duration));
    }
}

pub fn screen(gate: &Arc<FakeGate>, source: &Arc<FakeSource>, sink: &Arc<FakeSink>) -> TestScreen {
    LocationScreen::new(Arc::clone(gate), Arc::clone(source), Arc::clone(sink))
}
