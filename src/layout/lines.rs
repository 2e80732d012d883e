//! Line breaking — how many measures fit on a line, and where each line and
//! measure sits.

use crate::config::RenderConfig;
use crate::model::*;
use super::{LineLayout, MeasurePlacement, StaffPlacement};

/// Header width for the key signature.
pub(super) fn key_sig_width(key: &KeySignature, config: &RenderConfig) -> f64 {
    key.fifths.unsigned_abs() as f64 * config.key_accidental_width
}

/// Measures per line: the content width left after the clef/key/time
/// header, divided by the minimum width of one measure, clamped to the
/// configured range.
pub(super) fn measures_per_line(score: &Score, config: &RenderConfig) -> usize {
    let header = config.clef_width + key_sig_width(&score.key, config) + config.time_signature_width;
    let available = config.content_width() - header;
    let per_measure = config.min_beat_width * score.time.beats as f64;

    let fit = if available > 0.0 && per_measure > 0.0 {
        (available / per_measure).floor() as usize
    } else {
        0
    };
    fit.clamp(config.min_measures_per_line, config.max_measures_per_line.max(config.min_measures_per_line))
}

fn measure_has_lyrics(score: &Score, mi: usize) -> bool {
    score.tracks.iter().any(|t| {
        t.measures.get(mi).map_or(false, |m| {
            m.beats.iter().any(|b| b.notes.iter().any(|n| n.lyric.is_some()))
        })
    })
}

pub(super) fn compute_lines(
    score: &Score,
    config: &RenderConfig,
) -> (Vec<LineLayout>, Vec<MeasurePlacement>) {
    let measure_count = score.measure_count();
    let per_line = measures_per_line(score, config).max(1);
    let staff_height = config.staff_height();
    let track_count = score.tracks.len();
    let staves_height = track_count as f64 * staff_height
        + track_count.saturating_sub(1) as f64 * config.grand_staff_gap;

    let x_start = config.margin_left;
    let x_end = config.margin_left + config.content_width();

    let mut lines = Vec::new();
    let mut measures = Vec::with_capacity(measure_count);
    let mut current_y = config.margin_top;

    let indices: Vec<usize> = (0..measure_count).collect();
    for (line_idx, group) in indices.chunks(per_line).enumerate() {
        let is_first = line_idx == 0;

        // Every line shows the clef; only the first shows key and time.
        let header = config.clef_width
            + if is_first {
                key_sig_width(&score.key, config) + config.time_signature_width
            } else {
                0.0
            };
        let content_x = (x_start + header).min(x_end);
        let measure_width = (x_end - content_x) / group.len() as f64;
        let mut barlines = Vec::with_capacity(group.len());

        for (j, &mi) in group.iter().enumerate() {
            let x = content_x + j as f64 * measure_width;
            let padding = config.measure_padding.min(measure_width / 2.0);
            measures.push(MeasurePlacement {
                measure: mi,
                line: line_idx,
                x,
                width: measure_width,
                content_x: x + padding,
                content_width: (measure_width - 2.0 * padding).max(0.0),
            });
            barlines.push(x + measure_width);
        }

        let staves = score
            .tracks
            .iter()
            .enumerate()
            .map(|(ti, track)| {
                let top_y = current_y + ti as f64 * (staff_height + config.grand_staff_gap);
                StaffPlacement {
                    track: ti,
                    clef: track.clef,
                    top_y,
                    line_ys: (0..5).map(|i| top_y + i as f64 * config.staff_line_spacing).collect(),
                }
            })
            .collect();

        let has_lyrics = group.iter().any(|&mi| measure_has_lyrics(score, mi));
        let height = staves_height
            + if has_lyrics {
                super::constants::LYRIC_GAP_BELOW_STAFF + config.lyric_line_height
            } else {
                0.0
            };

        lines.push(LineLayout {
            index: line_idx,
            y: current_y,
            height,
            measures: group.to_vec(),
            show_clef: true,
            show_key: is_first,
            show_time: is_first,
            x_start,
            content_x,
            x_end,
            barlines,
            staves,
            has_lyrics,
        });

        current_y += height + config.line_gap;
    }

    (lines, measures)
}
