//! Layout engine — converts a Score into 2-D geometry.
//!
//! `layout` is a pure function of `(Score, RenderConfig)`: wrapped lines of
//! measures, one placement per note, beam groups, tie curves and lyrics, all
//! in the coordinate space of the configured page width. Nothing is drawn
//! here; a renderer consumes the `LayoutResult`.

pub mod constants;
mod beams;
mod lines;
mod lyrics;
mod notes;
mod pitch;
mod ties;

use serde::{Deserialize, Serialize};

use crate::config::{RenderConfig, Theme};
use crate::error::Result;
use crate::model::*;

pub use pitch::{staff_position, Accidental};

// ═══════════════════════════════════════════════════════════════════════
// Layout result
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Geometry of a whole score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub width: f64,
    pub height: f64,
    pub lines: Vec<LineLayout>,
    /// One entry per measure index, in order.
    pub measures: Vec<MeasurePlacement>,
    /// In (track, measure, beat, note) order.
    pub notes: Vec<NotePlacement>,
    pub rests: Vec<RestPlacement>,
    pub beams: Vec<BeamGroup>,
    pub ties: Vec<TieCurve>,
    pub lyrics: Vec<LyricPlacement>,
    pub theme: Theme,
}

/// One wrapped line of measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLayout {
    pub index: usize,
    /// Y of the top staff line of the first staff
    pub y: f64,
    pub height: f64,
    /// Measure indices on this line
    pub measures: Vec<usize>,
    pub show_clef: bool,
    pub show_key: bool,
    pub show_time: bool,
    /// Left edge of the staves
    pub x_start: f64,
    /// Where the first measure begins, after the clef/key/time header
    pub content_x: f64,
    pub x_end: f64,
    /// Right edge of each measure on the line
    pub barlines: Vec<f64>,
    pub staves: Vec<StaffPlacement>,
    pub has_lyrics: bool,
}

/// One track's five-line staff on a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffPlacement {
    pub track: usize,
    pub clef: Clef,
    pub top_y: f64,
    /// Top to bottom
    pub line_ys: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurePlacement {
    pub measure: usize,
    pub line: usize,
    pub x: f64,
    pub width: f64,
    /// Start of the note area, inside the barline padding
    pub content_x: f64,
    pub content_width: f64,
}

/// Colour slot for a note; the renderer maps it through the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRole {
    Neutral,
    RightHand,
    LeftHand,
}

impl From<Hand> for ColorRole {
    fn from(hand: Hand) -> Self {
        match hand {
            Hand::Right => ColorRole::RightHand,
            Hand::Left => ColorRole::LeftHand,
            Hand::None => ColorRole::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePlacement {
    pub position: Position,
    pub line: usize,
    pub pitch: u8,
    pub duration: DurationClass,
    pub dots: u8,
    /// Solid notehead; half and whole notes are hollow
    pub filled: bool,
    pub x: f64,
    pub y: f64,
    /// Diatonic steps above the staff's bottom line
    pub staff_position: i32,
    pub stem_up: bool,
    pub stem_x: f64,
    /// `None` for whole notes
    pub stem_end_y: Option<f64>,
    pub beam_group: Option<usize>,
    pub accidental: Option<Accidental>,
    pub ledger_lines: Vec<f64>,
    /// Start in beats from the beginning of the score
    pub start_beat: f64,
    pub duration_beats: f64,
    pub hand: Hand,
    pub color: ColorRole,
    pub tie_start: bool,
    pub tie_end: bool,
}

/// An empty beat slot; the renderer draws a sustain dash here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestPlacement {
    pub position: Position,
    pub line: usize,
    pub x: f64,
    /// Middle line of the staff
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamGroup {
    pub index: usize,
    pub track: usize,
    pub line: usize,
    /// Indices into `LayoutResult::notes`
    pub notes: Vec<usize>,
    /// Full beams shared by every member (1 = eighth)
    pub beam_count: u8,
    pub stem_up: bool,
    pub x_start: f64,
    pub x_end: f64,
    /// The beam is horizontal
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

/// A tie between two notes. Ties that wrap to a later line have two segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieCurve {
    pub from: Position,
    pub to: Position,
    /// Indices into `LayoutResult::notes`
    pub from_note: usize,
    pub to_note: usize,
    pub above: bool,
    pub segments: Vec<CurveSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricPlacement {
    pub position: Position,
    pub text: String,
    /// Centre of the syllable
    pub x: f64,
    /// Baseline
    pub y: f64,
    pub width: f64,
}

// ═══════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════

/// Lay out a score. Same inputs always give the same geometry.
pub fn layout(score: &Score, config: &RenderConfig) -> LayoutResult {
    if score.is_degenerate() {
        log::debug!(target: "layout", "degenerate score, empty layout");
        return LayoutResult::empty(config);
    }

    let (lines, measures) = lines::compute_lines(score, config);
    let (mut notes, rests) = notes::place_notes(score, config, &lines, &measures);
    let beams = beams::group_beams(&mut notes, score.time.beats as usize, config);
    let ties = ties::match_ties(&notes, &lines, &measures);
    let lyrics = lyrics::place_lyrics(score, config, &notes, &lines);

    let height = lines.last().map_or(config.margin_top, |l| l.y + l.height) + config.line_gap / 2.0;

    log::debug!(
        target: "layout",
        "{} lines, {} notes, {} beams, {} ties at width {}",
        lines.len(), notes.len(), beams.len(), ties.len(), config.page_width
    );

    LayoutResult {
        width: config.page_width,
        height,
        lines,
        measures,
        notes,
        rests,
        beams,
        ties,
        lyrics,
        theme: config.theme.clone(),
    }
}

/// Lay out with the default config at `page_width` (`None` → 820).
pub fn layout_at_width(score: &Score, page_width: Option<f64>) -> LayoutResult {
    let config = page_width.map_or_else(RenderConfig::default, RenderConfig::with_page_width);
    layout(score, &config)
}

impl LayoutResult {
    pub fn empty(config: &RenderConfig) -> Self {
        Self {
            width: config.page_width,
            height: 0.0,
            lines: Vec::new(),
            measures: Vec::new(),
            notes: Vec::new(),
            rests: Vec::new(),
            beams: Vec::new(),
            ties: Vec::new(),
            lyrics: Vec::new(),
            theme: config.theme.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Placement of the note at `pos`, if it was laid out.
    pub fn note(&self, pos: &Position) -> Option<&NotePlacement> {
        self.note_index(pos).map(|i| &self.notes[i])
    }

    pub fn note_index(&self, pos: &Position) -> Option<usize> {
        self.notes.iter().position(|n| n.position == *pos)
    }

    /// Line showing measure `index`.
    pub fn line_of_measure(&self, index: usize) -> Option<&LineLayout> {
        let line = self.measures.get(index)?.line;
        self.lines.get(line)
    }
}
