//! Android toasts through `android.widget.Toast`.
//!
//! `Toast.makeText` must run on a thread with a prepared `Looper`; hosts call
//! into the sink from their UI thread.

use jni::objects::{GlobalRef, JObject, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};

use crate::{NotificationError, Toast, ToastDuration};

/// `Toast.LENGTH_SHORT`.
const LENGTH_SHORT: jint = 0;
/// `Toast.LENGTH_LONG`.
const LENGTH_LONG: jint = 1;

fn map_jni_error(err: jni::errors::Error) -> NotificationError {
    NotificationError::Platform(err.to_string())
}

/// Toasts shown through an Android `Context`.
pub struct SystemToasts {
    vm: JavaVM,
    context: GlobalRef,
}

impl std::fmt::Debug for SystemToasts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemToasts").finish_non_exhaustive()
    }
}

impl SystemToasts {
    /// Bind the sink to an application or activity context.
    ///
    /// # Errors
    /// Returns a [`NotificationError`] if the JVM cannot be reached.
    pub fn new(env: &JNIEnv<'_>, context: &JObject<'_>) -> Result<Self, NotificationError> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let context = env.new_global_ref(context).map_err(map_jni_error)?;
        Ok(Self { vm, context })
    }

    /// Show a toast, reporting failures.
    ///
    /// # Errors
    /// Returns a [`NotificationError`] if any JNI call fails.
    pub fn try_show(&self, toast: &Toast) -> Result<(), NotificationError> {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        let length = match toast.display_duration() {
            ToastDuration::Short => LENGTH_SHORT,
            ToastDuration::Long => LENGTH_LONG,
        };

        let text = JObject::from(env.new_string(toast.message()).map_err(map_jni_error)?);
        let handle = env
            .call_static_method(
                "android/widget/Toast",
                "makeText",
                "(Landroid/content/Context;Ljava/lang/CharSequence;I)Landroid/widget/Toast;",
                &[
                    JValue::Object(self.context.as_obj()),
                    JValue::Object(&text),
                    JValue::Int(length),
                ],
            )
            .and_then(|value| value.l())
            .map_err(map_jni_error)?;

        env.call_method(&handle, "show", "()V", &[])
            .map_err(map_jni_error)?;
        Ok(())
    }
}
