//! Android location implementation over a host-provided JNI bridge.
//!
//! The fused location provider only reports through Java callbacks, so the
//! host app supplies a `geokit.location.PositionBridge` object with three
//! instance methods:
//!
//! - `void getCurrentPosition(long requestId, String optionsJson)`
//! - `void watchPosition(long watchId, String optionsJson)`
//! - `void clearWatch(long watchId)`
//!
//! and reports results back through the static native methods
//! `nativeOnPosition(long id, String positionJson)` and
//! `nativeOnError(long id, int code, String message)` exported below.
//! Options and positions travel as the camelCase JSON of [`OneShotOptions`],
//! [`WatchOptions`] and [`Position`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use async_channel::Sender;
use futures::future::{self, Either};
use futures_timer::Delay;
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    OneShotOptions, Position, PositionError, PositionErrorCode, PositionSource, PositionUpdate,
    WatchId, WatchOptions, WatchSubscription,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static CHANNELS: OnceLock<Mutex<HashMap<u64, Sender<PositionUpdate>>>> = OnceLock::new();

fn channels() -> &'static Mutex<HashMap<u64, Sender<PositionUpdate>>> {
    CHANNELS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn register(id: u64, sender: Sender<PositionUpdate>) {
    channels()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, sender);
}

fn unregister(id: u64) -> Option<Sender<PositionUpdate>> {
    channels()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id)
}

fn map_jni_error(err: jni::errors::Error) -> PositionError {
    PositionError::internal(format!("JNI: {err}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PositionError> {
    serde_json::to_string(value).map_err(|e| PositionError::internal(e.to_string()))
}

#[allow(clippy::cast_possible_wrap)]
const fn as_jlong(id: u64) -> jlong {
    id as jlong
}

/// Position source driving the host's `PositionBridge`.
pub struct SystemPositionSource {
    vm: JavaVM,
    bridge: GlobalRef,
}

impl std::fmt::Debug for SystemPositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPositionSource").finish_non_exhaustive()
    }
}

impl SystemPositionSource {
    /// Bind to a `PositionBridge` instance.
    ///
    /// # Errors
    /// Returns a [`PositionError`] if the JVM cannot be reached.
    pub fn new(env: &JNIEnv<'_>, bridge: &JObject<'_>) -> Result<Self, PositionError> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let bridge = env.new_global_ref(bridge).map_err(map_jni_error)?;
        Ok(Self { vm, bridge })
    }

    fn call_with_options(&self, method: &str, id: u64, options_json: &str) -> Result<(), PositionError> {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        let options = JObject::from(env.new_string(options_json).map_err(map_jni_error)?);
        env.call_method(
            self.bridge.as_obj(),
            method,
            "(JLjava/lang/String;)V",
            &[JValue::Long(as_jlong(id)), JValue::Object(&options)],
        )
        .map_err(map_jni_error)?;
        Ok(())
    }

    fn call_clear(&self, id: u64) -> Result<(), PositionError> {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        env.call_method(
            self.bridge.as_obj(),
            "clearWatch",
            "(J)V",
            &[JValue::Long(as_jlong(id))],
        )
        .map_err(map_jni_error)?;
        Ok(())
    }
}

impl PositionSource for SystemPositionSource {
    async fn current_position(&self, options: &OneShotOptions) -> PositionUpdate {
        let json = to_json(options)?;
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = async_channel::bounded(1);
        register(id, sender);

        if let Err(err) = self.call_with_options("getCurrentPosition", id, &json) {
            unregister(id);
            return Err(err);
        }

        let answer = std::pin::pin!(receiver.recv());
        let update = match future::select(answer, Delay::new(options.timeout())).await {
            Either::Left((Ok(update), _)) => update,
            Either::Left((Err(_), _)) => Err(PositionError::internal("position bridge went away")),
            Either::Right(((), _)) => Err(PositionError::timeout()),
        };
        unregister(id);
        update
    }

    fn watch_position(&self, options: &WatchOptions) -> Result<WatchSubscription, PositionError> {
        let json = to_json(options)?;
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = async_channel::unbounded();
        register(id, sender);

        if let Err(err) = self.call_with_options("watchPosition", id, &json) {
            unregister(id);
            return Err(err);
        }
        info!("bridge watch {id} started");

        Ok(WatchSubscription {
            id: WatchId::new(id),
            updates: Box::pin(receiver),
        })
    }

    fn clear_watch(&self, id: WatchId) {
        // Dropping the sender ends the stream even if the bridge call fails.
        if unregister(id.raw()).is_none() {
            return;
        }
        if let Err(err) = self.call_clear(id.raw()) {
            warn!("failed to clear bridge watch {}: {err}", id.raw());
        }
        info!("bridge watch {} cleared", id.raw());
    }
}

fn deliver(id: jlong, update: PositionUpdate) {
    let Ok(id) = u64::try_from(id) else {
        warn!("negative position bridge id {id}");
        return;
    };
    let sender = channels()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned();

    match sender {
        Some(sender) => {
            if let Err(err) = sender.try_send(update) {
                debug!("dropping update for {id}: {err}");
            }
        }
        None => debug!("update for inactive request {id} ignored"),
    }
}

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Result<String, PositionError> {
    env.get_string(value)
        .map(Into::into)
        .map_err(map_jni_error)
}

/// JNI entry point for `geokit.location.PositionBridge.nativeOnPosition`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_geokit_location_PositionBridge_nativeOnPosition(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    id: jlong,
    position_json: JString<'_>,
) {
    let update = read_string(&mut env, &position_json).and_then(|json| {
        serde_json::from_str::<Position>(&json)
            .map_err(|e| PositionError::internal(format!("malformed position: {e}")))
    });
    deliver(id, update);
}

/// JNI entry point for `geokit.location.PositionBridge.nativeOnError`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_geokit_location_PositionBridge_nativeOnError(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    id: jlong,
    code: jint,
    message: JString<'_>,
) {
    let message = read_string(&mut env, &message).unwrap_or_default();
    let code = PositionErrorCode::try_from(code).unwrap_or(PositionErrorCode::InternalError);
    deliver(id, Err(PositionError::new(code, message)));
}
