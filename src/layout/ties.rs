//! Tie matching and curve geometry (double-bezier shape, drawn away from
//! the stem).

use super::constants::*;
use super::{CurveSegment, LineLayout, MeasurePlacement, NotePlacement, Point, TieCurve};

/// Pair every tie-start with the nearest later note of the same track and
/// pitch that is flagged tie-end. Unmatched starts are dropped.
pub(super) fn match_ties(
    notes: &[NotePlacement],
    lines: &[LineLayout],
    measures: &[MeasurePlacement],
) -> Vec<TieCurve> {
    let mut ties = Vec::new();

    for (i, start) in notes.iter().enumerate() {
        if !start.tie_start {
            continue;
        }
        let end = notes
            .iter()
            .enumerate()
            .skip(i + 1)
            .find(|(_, n)| {
                n.tie_end && n.pitch == start.pitch && n.position.track == start.position.track
            });

        match end {
            Some((j, end)) => ties.push(build_tie(i, start, j, end, lines, measures)),
            None => log::trace!(target: "layout", "unmatched tie start at {:?}", start.position),
        }
    }

    ties
}

fn build_tie(
    from_note: usize,
    start: &NotePlacement,
    to_note: usize,
    end: &NotePlacement,
    lines: &[LineLayout],
    measures: &[MeasurePlacement],
) -> TieCurve {
    let above = !start.stem_up;

    let segments = if start.line == end.line {
        vec![curve(start.x, start.y, end.x, end.y, above)]
    } else {
        // Wrapped: run off the end of the first line, then in from the
        // start of the line holding the end note.
        let line_end = lines.get(start.line).map_or(start.x, |l| l.x_end);
        let line_start = measures
            .get(end.position.measure)
            .map_or(end.x, |m| m.x.min(end.x - NOTEHEAD_RX * 2.0));
        vec![
            curve(start.x, start.y, line_end, start.y, above),
            curve(line_start, end.y, end.x, end.y, above),
        ]
    };

    TieCurve {
        from: start.position,
        to: end.position,
        from_note,
        to_note,
        above,
        segments,
    }
}

fn curve(x1: f64, y1: f64, x2: f64, y2: f64, above: bool) -> CurveSegment {
    let y_dir = if above { -1.0 } else { 1.0 };

    let sx = x1 + NOTEHEAD_RX;
    let sy = y1 + y_dir * TIE_NOTEHEAD_Y_OFFSET;
    let ex = (x2 - NOTEHEAD_RX).max(sx);
    let ey = y2 + y_dir * TIE_NOTEHEAD_Y_OFFSET;

    let dx = (ex - sx).abs().max(1.0);
    let height = (dx * TIE_HEIGHT_FACTOR).clamp(TIE_MIN_HEIGHT, TIE_MAX_HEIGHT);
    let mid_y = (sy + ey) / 2.0;

    CurveSegment {
        start: Point { x: sx, y: sy },
        control1: Point { x: sx + dx * 0.25, y: mid_y + y_dir * height },
        control2: Point { x: sx + dx * 0.75, y: mid_y + y_dir * height },
        end: Point { x: ex, y: ey },
    }
}
