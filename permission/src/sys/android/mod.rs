//! Android permission implementation using JNI.
//!
//! Status checks go straight to `Context.checkSelfPermission`. Prompts go
//! through `Activity.requestPermissions`, whose answer arrives in the host
//! activity's `onRequestPermissionsResult`. The host forwards that answer with
//! [`deliver_request_result`] (or the `PermissionBridge` native method below),
//! which wakes the pending [`PermissionGate::request`] future.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use async_channel::Sender;
use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::sys::{jboolean, jint, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use log::{debug, warn};

use crate::{HostPlatform, Permission, PermissionError, PermissionGate, PermissionStatus};

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: jint = 0;

/// Request codes handed to `requestPermissions`; the host echoes them back.
static NEXT_REQUEST_CODE: AtomicI32 = AtomicI32::new(0x6e00);
static PENDING: OnceLock<Mutex<HashMap<jint, Sender<bool>>>> = OnceLock::new();

fn pending() -> &'static Mutex<HashMap<jint, Sender<bool>>> {
    PENDING.get_or_init(|| Mutex::new(HashMap::new()))
}

fn map_jni_error(err: jni::errors::Error) -> PermissionError {
    PermissionError::Platform(err.to_string())
}

/// Permission gate bound to a live Android `Activity`.
pub struct SystemPermissionGate {
    vm: JavaVM,
    activity: GlobalRef,
    api_level: u32,
}

impl std::fmt::Debug for SystemPermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPermissionGate")
            .field("api_level", &self.api_level)
            .finish_non_exhaustive()
    }
}

impl SystemPermissionGate {
    /// Bind a gate to the given activity.
    ///
    /// # Errors
    /// Returns a [`PermissionError`] if the JVM cannot be reached or the
    /// platform API level cannot be read.
    pub fn new(env: &mut JNIEnv<'_>, activity: &JObject<'_>) -> Result<Self, PermissionError> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let activity = env.new_global_ref(activity).map_err(map_jni_error)?;
        let api_level = env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
            .and_then(|value| value.i())
            .map_err(map_jni_error)?;

        Ok(Self {
            vm,
            activity,
            api_level: u32::try_from(api_level).unwrap_or_default(),
        })
    }

    fn with_env<T, F>(&self, action: F) -> Result<T, PermissionError>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<T>,
    {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        action(&mut env, self.activity.as_obj()).map_err(map_jni_error)
    }

    fn self_permission(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        let result = self.with_env(|env, activity| {
            let name = JObject::from(env.new_string(permission.android_name())?);
            env.call_method(
                activity,
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&name)],
            )?
            .i()
        })?;

        Ok(if result == PERMISSION_GRANTED {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    fn should_show_rationale(&self, permission: Permission) -> Result<bool, PermissionError> {
        self.with_env(|env, activity| {
            let name = JObject::from(env.new_string(permission.android_name())?);
            env.call_method(
                activity,
                "shouldShowRequestPermissionRationale",
                "(Ljava/lang/String;)Z",
                &[JValue::Object(&name)],
            )?
            .z()
        })
    }

    fn launch_prompt(&self, permission: Permission, request_code: jint) -> Result<(), PermissionError> {
        self.with_env(|env, activity| {
            let name = env.new_string(permission.android_name())?;
            let names = JObject::from(env.new_object_array(1, "java/lang/String", &name)?);
            env.call_method(
                activity,
                "requestPermissions",
                "([Ljava/lang/String;I)V",
                &[JValue::Object(&names), JValue::Int(request_code)],
            )?;
            Ok(())
        })
    }
}

impl PermissionGate for SystemPermissionGate {
    fn host(&self) -> HostPlatform {
        HostPlatform::Android {
            api_level: self.api_level,
        }
    }

    async fn check(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        if !self.host().enforces_runtime_permission() {
            return Ok(PermissionStatus::Granted);
        }
        self.self_permission(permission)
    }

    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        if !self.host().enforces_runtime_permission() {
            return Ok(PermissionStatus::Granted);
        }

        let request_code = NEXT_REQUEST_CODE.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = async_channel::bounded(1);
        pending()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_code, sender);

        if let Err(err) = self.launch_prompt(permission, request_code) {
            pending()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&request_code);
            return Err(err);
        }

        let granted = receiver
            .recv()
            .await
            .map_err(|_| PermissionError::Abandoned)?;
        debug!("permission request {request_code} answered, granted={granted}");

        if granted {
            return Ok(PermissionStatus::Granted);
        }

        // A denial without a rationale means "don't ask again" was ticked.
        if self.should_show_rationale(permission)? {
            Ok(PermissionStatus::Denied)
        } else {
            Ok(PermissionStatus::DeniedPermanently)
        }
    }
}

/// Forward the outcome of `Activity.onRequestPermissionsResult`.
///
/// Returns `false` if no request with this code is pending.
pub fn deliver_request_result(request_code: i32, granted: bool) -> bool {
    let sender = pending()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&request_code);

    match sender {
        Some(sender) => {
            if let Err(err) = sender.try_send(granted) {
                warn!("permission result for request {request_code} dropped: {err}");
            }
            true
        }
        None => false,
    }
}

/// JNI entry point for `geokit.permission.PermissionBridge.nativeOnRequestPermissionsResult`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_geokit_permission_PermissionBridge_nativeOnRequestPermissionsResult(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    request_code: jint,
    granted: jboolean,
) {
    if !deliver_request_result(request_code, granted == JNI_TRUE) {
        warn!("no pending permission request with code {request_code}");
    }
}
