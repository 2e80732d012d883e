//! Rendering and playback configuration.
//!
//! Both configs deserialize from JSON with every field optional; missing
//! fields take the defaults from `layout::constants`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};
use crate::layout::constants::*;

/// Colours handed through to the renderer. The engine never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub note: String,
    pub staff: String,
    pub right_hand: String,
    pub left_hand: String,
    pub highlight: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            note: NOTE_COLOR.to_string(),
            staff: STAFF_COLOR.to_string(),
            right_hand: RIGHT_HAND_COLOR.to_string(),
            left_hand: LEFT_HAND_COLOR.to_string(),
            highlight: HIGHLIGHT_COLOR.to_string(),
        }
    }
}

/// Page geometry and spacing for the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Total width; on phones pass the screen width in points.
    pub page_width: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub staff_line_spacing: f64,
    pub min_beat_width: f64,
    pub min_measures_per_line: usize,
    pub max_measures_per_line: usize,
    pub clef_width: f64,
    pub key_accidental_width: f64,
    pub time_signature_width: f64,
    pub grand_staff_gap: f64,
    pub line_gap: f64,
    pub stem_length: f64,
    pub measure_padding: f64,
    pub lyric_line_height: f64,
    pub theme: Theme,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            margin_left: PAGE_MARGIN_LEFT,
            margin_right: PAGE_MARGIN_RIGHT,
            margin_top: PAGE_MARGIN_TOP,
            staff_line_spacing: STAFF_LINE_SPACING,
            min_beat_width: MIN_BEAT_WIDTH,
            min_measures_per_line: MIN_MEASURES_PER_LINE,
            max_measures_per_line: MAX_MEASURES_PER_LINE,
            clef_width: CLEF_SPACE,
            key_accidental_width: KEY_SIG_ACCIDENTAL_SPACE,
            time_signature_width: TIME_SIG_SPACE,
            grand_staff_gap: GRAND_STAFF_GAP,
            line_gap: LINE_GAP,
            stem_length: STEM_LENGTH,
            measure_padding: MEASURE_PADDING,
            lyric_line_height: LYRIC_LINE_HEIGHT,
            theme: Theme::default(),
        }
    }
}

impl RenderConfig {
    /// Default config at the given page width. A non-positive width keeps
    /// the default (820).
    pub fn with_page_width(page_width: f64) -> Self {
        let mut config = Self::default();
        if page_width.is_finite() && page_width > 0.0 {
            config.page_width = page_width;
        }
        config
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Width between the margins.
    pub fn content_width(&self) -> f64 {
        (self.page_width - self.margin_left - self.margin_right).max(0.0)
    }

    /// Height of one five-line staff.
    pub fn staff_height(&self) -> f64 {
        self.staff_line_spacing * 4.0
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.page_width.is_finite() && self.page_width > 0.0) {
            return Err(ScoreError::InvalidConfig(format!(
                "page_width must be positive, got {}",
                self.page_width
            )));
        }
        if self.min_measures_per_line == 0 || self.min_measures_per_line > self.max_measures_per_line {
            return Err(ScoreError::InvalidConfig(format!(
                "measures per line range [{}, {}] is empty",
                self.min_measures_per_line, self.max_measures_per_line
            )));
        }
        if self.staff_line_spacing <= 0.0 || self.min_beat_width <= 0.0 {
            return Err(ScoreError::InvalidConfig(
                "staff_line_spacing and min_beat_width must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Real-time playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Driver polling interval
    pub poll_interval_ms: u64,
    /// Entries starting within this window of "now" are fired early
    pub lookahead_ms: f64,
    /// Publish UI state every N ticks (2 → ~30 Hz at 16 ms)
    pub publish_every: u32,
    pub metronome: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 16,
            lookahead_ms: 20.0,
            publish_every: 2,
            metronome: true,
        }
    }
}

impl PlayerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.poll_interval_ms == 0 {
            return Err(ScoreError::InvalidConfig("poll_interval_ms must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn lookahead_secs(&self) -> f64 {
        self.lookahead_ms.max(0.0) / 1000.0
    }
}
