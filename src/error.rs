//! Error types.
//!
//! The layout engine and the playback scheduler never fail: bad positions
//! resolve to "nothing found" and degenerate scores produce empty output.
//! Errors only come from parsing input and from score edits.

use thiserror::Error;

use crate::model::Position;

#[derive(Error, Debug)]
pub enum ScoreError {
    /// Score, config or layout JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Track {0} does not exist")]
    TrackOutOfRange(usize),

    #[error("Measure {measure} does not exist in track {track}")]
    MeasureOutOfRange { track: usize, measure: usize },

    /// The beat slot is past the time signature's beat count.
    #[error("Beat {beat} overflows a measure of {beats_per_measure} beats")]
    BeatOutOfRange { beat: usize, beats_per_measure: u32 },

    #[error("No note at {0:?}")]
    NoteOutOfRange(Position),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Failed to start playback thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScoreError>;

/// Failure reported by a sound device. The player logs these and carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Sound device unavailable")]
    Unavailable,

    #[error("Sound backend error: {0}")]
    Backend(String),
}
