//! Data model for a symbolic score: notes grouped into beats, beats into
//! measures, measures into tracks.
//!
//! These are plain values. Edits produce a new `Score` (see `editor`), and
//! the layout engine and playback scheduler only ever read a snapshot.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Rhythmic duration class of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationClass {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl DurationClass {
    /// Sub-beat subdivision count. Zero for quarter-or-longer classes.
    ///
    /// This is the one rule that decides whether notes sharing a beat sound
    /// together (weight 0, a chord) or one after another (a sequence).
    pub fn beam_weight(self) -> u8 {
        match self {
            DurationClass::Whole | DurationClass::Half | DurationClass::Quarter => 0,
            DurationClass::Eighth => 1,
            DurationClass::Sixteenth => 2,
            DurationClass::ThirtySecond => 3,
        }
    }

    /// True when same-beat siblings of this class are played in series.
    pub fn is_sequence(self) -> bool {
        self.beam_weight() > 0
    }

    /// Undotted length in quarter notes.
    pub fn quarter_length(self) -> f64 {
        match self {
            DurationClass::Whole => 4.0,
            DurationClass::Half => 2.0,
            DurationClass::Quarter => 1.0,
            DurationClass::Eighth => 0.5,
            DurationClass::Sixteenth => 0.25,
            DurationClass::ThirtySecond => 0.125,
        }
    }

    /// Hollow noteheads for half and whole notes.
    pub fn is_filled(self) -> bool {
        !matches!(self, DurationClass::Whole | DurationClass::Half)
    }

    pub fn has_stem(self) -> bool {
        self != DurationClass::Whole
    }
}

/// Clef of a staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clef {
    #[default]
    Treble,
    Bass,
}

/// Which hand plays a note or a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
    #[default]
    None,
}

/// A single note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Semitone number (MIDI numbering, middle C = 60)
    pub pitch: u8,
    pub duration: DurationClass,
    #[serde(default)]
    pub dots: u8,
    /// Precise start inside the beat, in beats. Set by importers of
    /// externally timed material; overrides the chord/sequence placement.
    #[serde(default)]
    pub offset_beats: Option<f64>,
    /// Precise length in beats; overrides the duration class.
    #[serde(default)]
    pub duration_beats: Option<f64>,
    #[serde(default)]
    pub tie_start: bool,
    #[serde(default)]
    pub tie_end: bool,
    #[serde(default)]
    pub lyric: Option<String>,
    /// Overrides the owning track's hand.
    #[serde(default)]
    pub hand: Option<Hand>,
}

/// Notes sharing one beat slot of a measure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Beat {
    /// 0-based beat slot within the measure
    pub index: usize,
    pub notes: Vec<Note>,
}

/// A measure (bar).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Measure {
    /// 1-based measure number
    pub number: u32,
    /// Beats in any order; see `sorted_beats` for canonical order.
    pub beats: Vec<Beat>,
}

/// One staff's worth of music (a hand of a grand staff, or a melody).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub clef: Clef,
    #[serde(default)]
    pub hand: Hand,
    #[serde(default)]
    pub instrument: String,
    pub measures: Vec<Measure>,
}

/// Key signature as a count of sharps (positive) or flats (negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeySignature {
    pub fifths: i8,
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per measure (3 in 3/4)
    pub beats: u32,
    /// Beat unit (4 in 3/4)
    pub beat_unit: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { beats: 4, beat_unit: 4 }
    }
}

/// A complete score. All tracks share the key, time signature and tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub title: Option<String>,
    #[serde(default)]
    pub composer: Option<String>,
    #[serde(default)]
    pub key: KeySignature,
    #[serde(default)]
    pub time: TimeSignature,
    /// Nominal tempo in beat units per minute
    pub tempo_bpm: f64,
    pub tracks: Vec<Track>,
}

/// Address of a beat or note inside a score.
///
/// `note == -1` addresses the beat itself rather than a specific note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub track: usize,
    /// 0-based index into `Track::measures`
    pub measure: usize,
    /// Beat slot (`Beat::index`)
    pub beat: usize,
    /// Index into `Beat::notes`, or -1
    pub note: i32,
}

impl Position {
    pub fn note(track: usize, measure: usize, beat: usize, note: usize) -> Self {
        Self { track, measure, beat, note: note as i32 }
    }

    pub fn beat(track: usize, measure: usize, beat: usize) -> Self {
        Self { track, measure, beat, note: -1 }
    }

    pub fn note_index(&self) -> Option<usize> {
        usize::try_from(self.note).ok()
    }
}

impl Note {
    pub fn new(pitch: u8, duration: DurationClass) -> Self {
        Self {
            pitch,
            duration,
            dots: 0,
            offset_beats: None,
            duration_beats: None,
            tie_start: false,
            tie_end: false,
            lyric: None,
            hand: None,
        }
    }

    /// Length in quarter notes including dots.
    pub fn quarter_length(&self) -> f64 {
        let dot_factor = 2.0 - 0.5f64.powi(self.dots as i32);
        self.duration.quarter_length() * dot_factor
    }

    /// Length in beats of the given time signature.
    pub fn beats(&self, time: &TimeSignature) -> f64 {
        if let Some(b) = self.duration_beats {
            return b.max(0.0);
        }
        self.quarter_length() * time.beat_unit as f64 / 4.0
    }

    pub fn is_sequence(&self) -> bool {
        self.duration.is_sequence()
    }
}

impl Beat {
    pub fn new(index: usize, notes: Vec<Note>) -> Self {
        Self { index, notes }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Total duration in beats: the longest chord member, or the sum of the
    /// sequence members, whichever is longer. A note is never counted twice.
    pub fn total_beats(&self, time: &TimeSignature) -> f64 {
        let chord = self
            .notes
            .iter()
            .filter(|n| !n.is_sequence())
            .map(|n| n.beats(time))
            .fold(0.0f64, f64::max);
        let sequence: f64 = self
            .notes
            .iter()
            .filter(|n| n.is_sequence())
            .map(|n| n.beats(time))
            .sum();
        chord.max(sequence)
    }

    /// Span that sequence members subdivide: the longest member's length.
    pub fn span_beats(&self, time: &TimeSignature) -> f64 {
        self.notes.iter().map(|n| n.beats(time)).fold(0.0f64, f64::max)
    }
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Self { number, beats: Vec::new() }
    }

    /// Beats in canonical (beat index) order.
    pub fn sorted_beats(&self) -> Vec<&Beat> {
        let mut beats: Vec<&Beat> = self.beats.iter().collect();
        beats.sort_by_key(|b| b.index);
        beats
    }

    pub fn beat(&self, index: usize) -> Option<&Beat> {
        self.beats.iter().find(|b| b.index == index)
    }

    pub fn beat_mut(&mut self, index: usize) -> Option<&mut Beat> {
        self.beats.iter_mut().find(|b| b.index == index)
    }

    pub fn note_count(&self) -> usize {
        self.beats.iter().map(|b| b.notes.len()).sum()
    }
}

impl Track {
    pub fn new(id: &str, name: &str, clef: Clef, hand: Hand) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            clef,
            hand,
            instrument: "piano".to_string(),
            measures: Vec::new(),
        }
    }

    /// Hand that plays a note of this track.
    pub fn hand_for(&self, note: &Note) -> Hand {
        note.hand.unwrap_or(self.hand)
    }
}

impl TimeSignature {
    pub fn new(beats: u32, beat_unit: u32) -> Self {
        Self { beats, beat_unit }
    }
}

impl Score {
    /// Create an empty 4/4 score at the given tempo.
    pub fn new(tempo_bpm: f64) -> Self {
        Self {
            title: None,
            composer: None,
            key: KeySignature::default(),
            time: TimeSignature::default(),
            tempo_bpm,
            tracks: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Longest track length. Tracks may be ragged while editing.
    pub fn measure_count(&self) -> usize {
        self.tracks.iter().map(|t| t.measures.len()).max().unwrap_or(0)
    }

    /// True when nothing can be laid out or scheduled.
    pub fn is_degenerate(&self) -> bool {
        self.tracks.is_empty()
            || self.measure_count() == 0
            || self.time.beats == 0
            || self.time.beat_unit == 0
            || !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0)
    }

    /// Duration of one measure in seconds at the nominal tempo.
    pub fn measure_duration(&self) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        self.time.beats as f64 * 60.0 / self.tempo_bpm
    }

    /// Duration of the whole score in seconds at the nominal tempo.
    pub fn total_duration(&self) -> f64 {
        self.measure_duration() * self.measure_count() as f64
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn measure_at(&self, pos: &Position) -> Option<&Measure> {
        self.tracks.get(pos.track)?.measures.get(pos.measure)
    }

    pub fn beat_at(&self, pos: &Position) -> Option<&Beat> {
        self.measure_at(pos)?.beat(pos.beat)
    }

    /// Note addressed by `pos`, or `None` when any index is out of range or
    /// the position addresses a whole beat.
    pub fn note_at(&self, pos: &Position) -> Option<&Note> {
        self.beat_at(pos)?.notes.get(pos.note_index()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eighth(pitch: u8) -> Note {
        Note::new(pitch, DurationClass::Eighth)
    }

    #[test]
    fn beam_weight_splits_chord_and_sequence_classes() {
        assert_eq!(DurationClass::Quarter.beam_weight(), 0);
        assert_eq!(DurationClass::Whole.beam_weight(), 0);
        assert_eq!(DurationClass::Eighth.beam_weight(), 1);
        assert_eq!(DurationClass::ThirtySecond.beam_weight(), 3);
        assert!(!DurationClass::Half.is_sequence());
        assert!(DurationClass::Sixteenth.is_sequence());
    }

    #[test]
    fn dotted_lengths() {
        let mut n = Note::new(60, DurationClass::Quarter);
        n.dots = 1;
        assert!((n.quarter_length() - 1.5).abs() < 1e-12);
        n.dots = 2;
        assert!((n.quarter_length() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn beats_follow_beat_unit() {
        let n = Note::new(60, DurationClass::Quarter);
        assert_eq!(n.beats(&TimeSignature::new(4, 4)), 1.0);
        assert_eq!(n.beats(&TimeSignature::new(6, 8)), 2.0);
        assert_eq!(n.beats(&TimeSignature::new(2, 2)), 0.5);
    }

    #[test]
    fn beat_total_never_double_counts() {
        let time = TimeSignature::default();
        let chord = Beat::new(0, vec![
            Note::new(48, DurationClass::Half),
            Note::new(52, DurationClass::Quarter),
        ]);
        assert_eq!(chord.total_beats(&time), 2.0);

        let run = Beat::new(0, vec![eighth(60), eighth(62), eighth(64)]);
        assert_eq!(run.total_beats(&time), 1.5);
        assert_eq!(run.span_beats(&time), 0.5);
    }

    #[test]
    fn malformed_positions_find_nothing() {
        let mut score = Score::new(120.0);
        let mut track = Track::new("rh", "Right", Clef::Treble, Hand::Right);
        let mut m = Measure::new(1);
        m.beats.push(Beat::new(2, vec![eighth(60)]));
        track.measures.push(m);
        score.tracks.push(track);

        assert!(score.note_at(&Position::note(0, 0, 2, 0)).is_some());
        assert!(score.note_at(&Position::beat(0, 0, 2)).is_none());
        assert!(score.note_at(&Position::note(1, 0, 2, 0)).is_none());
        assert!(score.note_at(&Position::note(0, 3, 2, 0)).is_none());
        assert!(score.note_at(&Position::note(0, 0, 1, 0)).is_none());
        assert!(score.note_at(&Position::note(0, 0, 2, 5)).is_none());
    }

    #[test]
    fn zero_tempo_has_zero_duration() {
        let mut score = Score::new(0.0);
        let mut track = Track::new("m", "Melody", Clef::Treble, Hand::None);
        track.measures.push(Measure::new(1));
        score.tracks.push(track);
        assert_eq!(score.total_duration(), 0.0);
    }
}
