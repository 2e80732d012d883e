//! Timing arithmetic shared by the layout engine and the playback scheduler.
//! It answers "when does each measure and beat start?" and "where inside its
//! beat does each note sound?", so that a visual chord is also an audio chord.

use crate::model::{Beat, Score, TimeSignature};

/// Measure/beat timing for one score at one effective tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Seconds per beat at the score's nominal tempo
    pub nominal_seconds_per_beat: f64,
    pub beats_per_measure: u32,
    /// `nominal_tempo / effective_tempo`; 1.0 at the nominal tempo
    pub scale: f64,
}

impl Timing {
    /// Timing at the score's own tempo, or `None` for a score with zero
    /// tempo, zero beats per measure or no measures.
    pub fn nominal(score: &Score) -> Option<Self> {
        Self::at_tempo(score, score.tempo_bpm)
    }

    /// Timing rescaled to run at `tempo_bpm` instead of the nominal tempo.
    pub fn at_tempo(score: &Score, tempo_bpm: f64) -> Option<Self> {
        if score.is_degenerate() || !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            return None;
        }
        Some(Self {
            nominal_seconds_per_beat: 60.0 / score.tempo_bpm,
            beats_per_measure: score.time.beats,
            scale: score.tempo_bpm / tempo_bpm,
        })
    }

    /// Effective seconds per beat.
    pub fn beat_duration(&self) -> f64 {
        self.nominal_seconds_per_beat * self.scale
    }

    pub fn measure_duration(&self) -> f64 {
        self.beats_per_measure as f64 * self.beat_duration()
    }

    /// Start of measure `index` (0-based).
    pub fn measure_start(&self, index: usize) -> f64 {
        let nominal = index as f64 * self.beats_per_measure as f64 * self.nominal_seconds_per_beat;
        nominal * self.scale
    }

    /// Offset of beat slot `index` from its measure start.
    pub fn beat_offset(&self, index: usize) -> f64 {
        index as f64 * self.nominal_seconds_per_beat * self.scale
    }

    /// Convert a length in beats to seconds.
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.nominal_seconds_per_beat * self.scale
    }

    pub fn total_duration(&self, measure_count: usize) -> f64 {
        self.measure_start(measure_count)
    }

    /// Measure containing `time`, clamped to the last measure.
    pub fn measure_at(&self, time: f64, measure_count: usize) -> usize {
        let md = self.measure_duration();
        if md <= 0.0 || measure_count == 0 {
            return 0;
        }
        ((time.max(0.0) / md).floor() as usize).min(measure_count - 1)
    }
}

/// Where one note of a beat sits, relative to the beat's start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTiming {
    /// Index into `Beat::notes`
    pub note: usize,
    /// Start offset from the beat start, in beats
    pub offset_beats: f64,
    pub duration_beats: f64,
    /// Horizontal fraction of the beat slot, in [0, 1)
    pub slot_fraction: f64,
}

/// Apply the chord/sequence rule to one beat.
///
/// Chord members (zero beam weight) all start with the beat. The i-th of N
/// sequence members starts `i / N` of the way through the beat's span, the
/// span being its longest member. Explicit offsets from imported material
/// win over both.
pub fn beat_note_timings(beat: &Beat, time: &TimeSignature) -> Vec<NoteTiming> {
    let span = beat.span_beats(time);
    let sequence_count = beat.notes.iter().filter(|n| n.is_sequence()).count();
    let mut sequence_idx = 0usize;

    beat.notes
        .iter()
        .enumerate()
        .map(|(i, note)| {
            let fraction = if note.is_sequence() && sequence_count > 0 {
                let f = sequence_idx as f64 / sequence_count as f64;
                sequence_idx += 1;
                f
            } else {
                0.0
            };

            let (offset_beats, slot_fraction) = match note.offset_beats {
                Some(off) => {
                    let off = off.max(0.0);
                    (off, off.min(0.999))
                }
                None => (fraction * span, fraction),
            };

            NoteTiming {
                note: i,
                offset_beats,
                duration_beats: note.beats(time),
                slot_fraction,
            }
        })
        .collect()
}
