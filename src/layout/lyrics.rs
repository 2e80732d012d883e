//! Lyric syllable placement under each track's staff.

use crate::config::RenderConfig;
use crate::model::Score;
use super::constants::LYRIC_GAP_BELOW_STAFF;
use super::{LineLayout, LyricPlacement, NotePlacement};

const LYRIC_FONT_SIZE: f64 = 13.0;
const LYRIC_CHAR_WIDTH_FACTOR: f64 = 0.55;

/// Estimate the rendered width of a syllable.
pub(super) fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * LYRIC_CHAR_WIDTH_FACTOR
}

pub(super) fn place_lyrics(
    score: &Score,
    config: &RenderConfig,
    notes: &[NotePlacement],
    lines: &[LineLayout],
) -> Vec<LyricPlacement> {
    notes
        .iter()
        .filter_map(|placement| {
            let text = score.note_at(&placement.position)?.lyric.as_ref()?;
            if text.trim().is_empty() {
                return None;
            }
            let staff = lines.get(placement.line)?.staves.get(placement.position.track)?;
            Some(LyricPlacement {
                position: placement.position,
                text: text.clone(),
                x: placement.x,
                y: staff.top_y + config.staff_height() + LYRIC_GAP_BELOW_STAFF,
                width: estimate_text_width(text, LYRIC_FONT_SIZE),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_characters_not_bytes() {
        assert_eq!(estimate_text_width("la", 10.0), 11.0);
        assert_eq!(estimate_text_width("童", 10.0), 5.5);
    }
}
