//! scoreengine — score layout and playback scheduling for an interactive
//! score editor/player.
//!
//! One `Score` goes in; two things come out:
//! - a `LayoutResult` with coordinates for every line, note, beam, tie and
//!   lyric at a given page width, and
//! - a `Schedule` of time-stamped notes that a `Player` fires against a
//!   monotonic clock, with tempo, speed, looping and hand isolation.
//!
//! # Example
//! ```no_run
//! use scoreengine::{layout_at_width, build_schedule, Score};
//!
//! let score = Score::from_json(r#"{"title": null, "tempo_bpm": 120, "tracks": []}"#).unwrap();
//! let layout = layout_at_width(&score, Some(390.0));
//! let schedule = build_schedule(&score);
//! println!("{} lines, {} notes", layout.lines.len(), schedule.entries.len());
//! ```

pub mod config;
pub mod device;
pub mod driver;
pub mod editor;
pub mod error;
pub mod layout;
pub mod model;
pub mod player;
pub mod schedule;
pub mod timemap;

#[cfg(target_os = "android")]
pub mod android;

pub use config::{PlayerConfig, RenderConfig, Theme};
pub use device::{RecordingDevice, SilentDevice, SoundDevice};
pub use driver::PlaybackDriver;
pub use editor::{EditCommand, Editor};
pub use error::{DeviceError, Result, ScoreError};
pub use layout::{layout, layout_at_width, LayoutResult};
pub use model::*;
pub use player::{PlayMode, PlayState, PlaybackState, Player};
pub use schedule::{build_schedule, build_schedule_at, Schedule, ScheduledNote};

/// Lay out a JSON score and return the layout as JSON.
///
/// `page_width` of `None` uses the default (820).
pub fn layout_json(score_json: &str, page_width: Option<f64>) -> Result<String> {
    let score = Score::from_json(score_json)?;
    layout_at_width(&score, page_width).to_json()
}

/// Schedule a JSON score at `speed` times its tempo and return the schedule
/// as JSON. A non-positive speed plays at the nominal tempo.
pub fn schedule_json(score_json: &str, speed: f64) -> Result<String> {
    let score = Score::from_json(score_json)?;
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    build_schedule_at(&score, score.tempo_bpm * speed).to_json()
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI — for iOS (static library) and Android (JNI)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

unsafe fn read_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn into_c_string(result: Result<String>) -> *mut c_char {
    match result {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(err) => {
            log::warn!("scoreengine call failed: {err}");
            std::ptr::null_mut()
        }
    }
}

/// Lay out a JSON score and return the layout as a JSON C string.
/// The caller must free the returned string with `scoreengine_free_string`.
///
/// `page_width` sets the layout width. Pass 0.0 to use the default.
///
/// # Safety
/// `score_json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn scoreengine_layout_json(
    score_json: *const c_char,
    page_width: f64,
) -> *mut c_char {
    let Some(json) = (unsafe { read_c_str(score_json) }) else {
        return std::ptr::null_mut();
    };
    let pw = if page_width > 0.0 { Some(page_width) } else { None };
    into_c_string(layout_json(json, pw))
}

/// Schedule a JSON score and return the schedule as a JSON C string.
/// The caller must free the returned string with `scoreengine_free_string`.
///
/// # Safety
/// `score_json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn scoreengine_schedule_json(
    score_json: *const c_char,
    speed: f64,
) -> *mut c_char {
    let Some(json) = (unsafe { read_c_str(score_json) }) else {
        return std::ptr::null_mut();
    };
    into_c_string(schedule_json(json, speed))
}

/// Free a string previously returned by scoreengine functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scoreengine function, or null.
#[no_mangle]
pub unsafe extern "C" fn scoreengine_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
