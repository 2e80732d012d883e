//! Sound device collaborator.
//!
//! The engine never synthesizes audio. It hands note-on and metronome
//! clicks to a `SoundDevice` and moves on; failures are logged by the player
//! and otherwise ignored.

use std::sync::{Arc, Mutex};

use crate::error::DeviceError;
use crate::model::Hand;

/// Something that can make sound. Calls must return quickly.
pub trait SoundDevice: Send {
    fn play_note(&mut self, pitch: u8, hand: Hand) -> Result<(), DeviceError>;

    fn play_metronome_click(&mut self, strong: bool) -> Result<(), DeviceError>;
}

/// Device that makes no sound, for visual-only playback.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentDevice;

impl SoundDevice for SilentDevice {
    fn play_note(&mut self, _pitch: u8, _hand: Hand) -> Result<(), DeviceError> {
        Ok(())
    }

    fn play_metronome_click(&mut self, _strong: bool) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// What a `RecordingDevice` was asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Note { pitch: u8, hand: Hand },
    Click { strong: bool },
}

/// Device that records every request. Clones share one log, so a test can
/// keep a handle after giving the device to a player.
#[derive(Debug, Default, Clone)]
pub struct RecordingDevice {
    events: Arc<Mutex<Vec<DeviceEvent>>>,
    /// When set, every call records and then fails.
    pub failing: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn notes(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DeviceEvent::Note { pitch, .. } => Some(pitch),
                DeviceEvent::Click { .. } => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DeviceEvent::Click { strong } => Some(strong),
                DeviceEvent::Note { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn record(&self, event: DeviceEvent) -> Result<(), DeviceError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        if self.failing {
            Err(DeviceError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl SoundDevice for RecordingDevice {
    fn play_note(&mut self, pitch: u8, hand: Hand) -> Result<(), DeviceError> {
        self.record(DeviceEvent::Note { pitch, hand })
    }

    fn play_metronome_click(&mut self, strong: bool) -> Result<(), DeviceError> {
        self.record(DeviceEvent::Click { strong })
    }
}
