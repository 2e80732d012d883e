//! Default layout constants (all in content-space points). `RenderConfig`
//! takes its defaults from here.

// ── Page & margins ──────────────────────────────────────────────────
pub const DEFAULT_PAGE_WIDTH: f64 = 820.0;
pub const PAGE_MARGIN_LEFT: f64 = 50.0;
pub const PAGE_MARGIN_RIGHT: f64 = 30.0;
pub const PAGE_MARGIN_TOP: f64 = 30.0;

// ── Staff dimensions ────────────────────────────────────────────────
pub const STAFF_LINE_SPACING: f64 = 10.0; // distance between staff lines
pub const LINE_GAP: f64 = 90.0; // vertical space between wrapped lines
pub const GRAND_STAFF_GAP: f64 = 60.0; // gap between the staves of a grand staff

// ── Header widths ───────────────────────────────────────────────────
pub const CLEF_SPACE: f64 = 32.0; // drawn on every line
pub const KEY_SIG_ACCIDENTAL_SPACE: f64 = 10.0; // per sharp/flat
pub const TIME_SIG_SPACE: f64 = 24.0;

// ── Measure packing ─────────────────────────────────────────────────
pub const MIN_BEAT_WIDTH: f64 = 55.0;
pub const MIN_MEASURES_PER_LINE: usize = 1;
pub const MAX_MEASURES_PER_LINE: usize = 6;
pub const MEASURE_PADDING: f64 = 14.0; // inset from each barline

// ── Notes ───────────────────────────────────────────────────────────
pub const STEM_LENGTH: f64 = 30.0;
pub const NOTEHEAD_RX: f64 = 5.5;

// ── Ties ────────────────────────────────────────────────────────────
pub const TIE_NOTEHEAD_Y_OFFSET: f64 = 5.0;
pub const TIE_HEIGHT_FACTOR: f64 = 0.15;
pub const TIE_MIN_HEIGHT: f64 = 4.0;
pub const TIE_MAX_HEIGHT: f64 = 14.0;

// ── Lyrics ──────────────────────────────────────────────────────────
pub const LYRIC_LINE_HEIGHT: f64 = 16.0;
pub const LYRIC_GAP_BELOW_STAFF: f64 = 22.0;

// ── Colors ──────────────────────────────────────────────────────────
pub const NOTE_COLOR: &str = "#1a1a1a";
pub const STAFF_COLOR: &str = "#555555";
pub const RIGHT_HAND_COLOR: &str = "#2f6fd6";
pub const LEFT_HAND_COLOR: &str = "#d6612f";
pub const HIGHLIGHT_COLOR: &str = "#f2b705";
