//! JNI bindings for Android.
//!
//! These functions are called from Kotlin via the JNI bridge. Scores and
//! results cross the boundary as JSON strings.

use jni::objects::{JClass, JString};
use jni::sys::{jdouble, jfloat, jstring};
use jni::JNIEnv;

use crate::{layout_json, schedule_json};

fn to_jstring(env: &mut JNIEnv, result: crate::Result<String>) -> jstring {
    match result {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(err) => {
            log::warn!("scoreengine call failed: {err}");
            std::ptr::null_mut()
        }
    }
}

/// Lay out a JSON score.
///
/// Called from Kotlin as:
///   external fun layoutJson(scoreJson: String, pageWidth: Float): String?
#[no_mangle]
pub extern "system" fn Java_com_scoreengine_ScoreEngine_layoutJson(
    mut env: JNIEnv,
    _class: JClass,
    score_json: JString,
    page_width: jfloat,
) -> jstring {
    let json: String = match env.get_string(&score_json) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    let pw = if page_width > 0.0 { Some(page_width as f64) } else { None };

    let result = layout_json(&json, pw);
    to_jstring(&mut env, result)
}

/// Build the playback schedule of a JSON score.
///
/// Called from Kotlin as:
///   external fun scheduleJson(scoreJson: String, speed: Double): String?
#[no_mangle]
pub extern "system" fn Java_com_scoreengine_ScoreEngine_scheduleJson(
    mut env: JNIEnv,
    _class: JClass,
    score_json: JString,
    speed: jdouble,
) -> jstring {
    let json: String = match env.get_string(&score_json) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    let result = schedule_json(&json, speed);
    to_jstring(&mut env, result)
}
