//! Playback schedule — flattens a score into time-stamped note entries.
//!
//! Entries are computed at the score's nominal tempo and then rescaled by
//! `nominal / effective` tempo, so changing tempo or speed never reorders
//! them.

use serde::Serialize;

use crate::error::Result;
use crate::model::{Hand, Position, Score};
use crate::timemap::{beat_note_timings, Timing};

/// One note to sound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledNote {
    /// Seconds from the start of the score
    pub start: f64,
    /// Seconds
    pub duration: f64,
    pub pitch: u8,
    pub hand: Hand,
    /// Same address the layout uses, for highlighting
    pub position: Position,
}

impl ScheduledNote {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A sorted schedule plus the timing it was built with.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub entries: Vec<ScheduledNote>,
    /// Seconds, at the effective tempo
    pub total_duration: f64,
    pub beat_duration: f64,
    pub measure_duration: f64,
    pub beats_per_measure: u32,
    pub measure_count: usize,
    #[serde(skip)]
    timing: Option<Timing>,
}

impl Schedule {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            total_duration: 0.0,
            beat_duration: 0.0,
            measure_duration: 0.0,
            beats_per_measure: 0,
            measure_count: 0,
            timing: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn timing(&self) -> Option<&Timing> {
        self.timing.as_ref()
    }

    /// Start time of measure `index`; `index == measure_count` is the end.
    pub fn measure_start(&self, index: usize) -> f64 {
        self.timing.map_or(0.0, |t| t.measure_start(index))
    }

    pub fn measure_at(&self, time: f64) -> usize {
        self.timing.map_or(0, |t| t.measure_at(time, self.measure_count))
    }

    /// Index of the first entry starting at or after `time`.
    pub fn first_at_or_after(&self, time: f64) -> usize {
        self.entries.partition_point(|e| e.start < time)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build the schedule at the score's nominal tempo.
pub fn build_schedule(score: &Score) -> Schedule {
    build_schedule_at(score, score.tempo_bpm)
}

/// Build the schedule as if the score were played at `tempo_bpm`.
///
/// Sorted by start time; ties keep track order, then score order.
pub fn build_schedule_at(score: &Score, tempo_bpm: f64) -> Schedule {
    let Some(timing) = Timing::at_tempo(score, tempo_bpm) else {
        log::debug!(target: "playback", "degenerate score or tempo {tempo_bpm}, empty schedule");
        return Schedule::empty();
    };

    // (track, sequence number in score order, entry)
    let mut keyed: Vec<(usize, usize, ScheduledNote)> = Vec::new();
    let mut seq = 0usize;

    for (ti, track) in score.tracks.iter().enumerate() {
        for (mi, measure) in track.measures.iter().enumerate() {
            for beat in measure.sorted_beats() {
                let nominal_beat_start = (mi * score.time.beats as usize + beat.index) as f64
                    * timing.nominal_seconds_per_beat;

                for nt in beat_note_timings(beat, &score.time) {
                    let note = &beat.notes[nt.note];
                    let nominal_start =
                        nominal_beat_start + nt.offset_beats * timing.nominal_seconds_per_beat;
                    let nominal_duration = nt.duration_beats * timing.nominal_seconds_per_beat;

                    keyed.push((ti, seq, ScheduledNote {
                        start: nominal_start * timing.scale,
                        duration: nominal_duration * timing.scale,
                        pitch: note.pitch,
                        hand: track.hand_for(note),
                        position: Position::note(ti, mi, beat.index, nt.note),
                    }));
                    seq += 1;
                }
            }
        }
    }

    keyed.sort_by(|a, b| {
        a.2.start
            .total_cmp(&b.2.start)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    let measure_count = score.measure_count();
    Schedule {
        entries: keyed.into_iter().map(|(_, _, e)| e).collect(),
        total_duration: timing.total_duration(measure_count),
        beat_duration: timing.beat_duration(),
        measure_duration: timing.measure_duration(),
        beats_per_measure: timing.beats_per_measure,
        measure_count,
        timing: Some(timing),
    }
}
