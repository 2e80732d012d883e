//! Note placement within measures.

use crate::config::RenderConfig;
use crate::model::*;
use crate::timemap::beat_note_timings;
use super::constants::NOTEHEAD_RX;
use super::pitch::{accidental, ledger_lines, position_to_y, staff_position, MIDDLE_LINE};
use super::{LineLayout, MeasurePlacement, NotePlacement, RestPlacement};

/// Place every note of every track. Empty beat slots become rests.
///
/// Beat slots are spaced evenly over the measure's content width. Chord
/// members share their beat's x; sequence members spread across the slot in
/// the same proportions as their start times.
pub(super) fn place_notes(
    score: &Score,
    config: &RenderConfig,
    lines: &[LineLayout],
    measures: &[MeasurePlacement],
) -> (Vec<NotePlacement>, Vec<RestPlacement>) {
    let beats_per_measure = score.time.beats as usize;
    let mut notes = Vec::new();
    let mut rests = Vec::new();

    for (ti, track) in score.tracks.iter().enumerate() {
        for (mi, measure) in track.measures.iter().enumerate() {
            let Some(mp) = measures.get(mi) else { continue };
            let Some(staff) = lines.get(mp.line).and_then(|l| l.staves.get(ti)) else { continue };
            let slot_width = mp.content_width / beats_per_measure as f64;

            for b in 0..beats_per_measure {
                if measure.beat(b).map_or(true, |beat| beat.is_empty()) {
                    rests.push(RestPlacement {
                        position: Position::beat(ti, mi, b),
                        line: mp.line,
                        x: mp.content_x + (b as f64 + 0.5) * slot_width,
                        y: position_to_y(MIDDLE_LINE, staff.top_y, config.staff_line_spacing),
                    });
                }
            }

            // Beats past the time signature are kept and simply run past
            // the barline.
            for beat in measure.sorted_beats() {
                let beat_start = (mi * beats_per_measure + beat.index) as f64;

                for timing in beat_note_timings(beat, &score.time) {
                    let note = &beat.notes[timing.note];
                    let pos = staff_position(note.pitch, track.clef, &score.key);
                    let x = mp.content_x + (beat.index as f64 + timing.slot_fraction) * slot_width;
                    let y = position_to_y(pos, staff.top_y, config.staff_line_spacing);
                    let stem_up = pos < MIDDLE_LINE;
                    let hand = track.hand_for(note);

                    notes.push(NotePlacement {
                        position: Position::note(ti, mi, beat.index, timing.note),
                        line: mp.line,
                        pitch: note.pitch,
                        duration: note.duration,
                        dots: note.dots,
                        filled: note.duration.is_filled(),
                        x,
                        y,
                        staff_position: pos,
                        stem_up,
                        stem_x: stem_x(x, stem_up),
                        stem_end_y: note.duration.has_stem().then(|| {
                            if stem_up { y - config.stem_length } else { y + config.stem_length }
                        }),
                        beam_group: None,
                        accidental: accidental(note.pitch, &score.key),
                        ledger_lines: ledger_lines(pos, staff.top_y, config.staff_line_spacing),
                        start_beat: beat_start + timing.offset_beats,
                        duration_beats: timing.duration_beats,
                        hand,
                        color: hand.into(),
                        tie_start: note.tie_start,
                        tie_end: note.tie_end,
                    });
                }
            }
        }
    }

    (notes, rests)
}

/// Stems sit on the right of the notehead when up, on the left when down.
pub(super) fn stem_x(x: f64, stem_up: bool) -> f64 {
    if stem_up { x + NOTEHEAD_RX - 1.0 } else { x - NOTEHEAD_RX + 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lines::compute_lines;

    fn single_beat_score(notes: Vec<Note>) -> Score {
        let mut score = Score::new(120.0);
        let mut track = Track::new("rh", "Right", Clef::Treble, Hand::Right);
        let mut m = Measure::new(1);
        m.beats.push(Beat::new(1, notes));
        track.measures.push(m);
        score.tracks.push(track);
        score
    }

    fn place(score: &Score) -> (Vec<NotePlacement>, Vec<RestPlacement>) {
        let config = RenderConfig::default();
        let (lines, measures) = compute_lines(score, &config);
        place_notes(score, &config, &lines, &measures)
    }

    #[test]
    fn chord_members_share_x_and_start() {
        let score = single_beat_score(vec![
            Note::new(60, DurationClass::Quarter),
            Note::new(64, DurationClass::Quarter),
            Note::new(67, DurationClass::Quarter),
        ]);
        let (notes, rests) = place(&score);
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.x == notes[0].x && n.start_beat == 1.0));
        assert!(notes[0].y > notes[2].y);
        // Beats 0, 2 and 3 are empty
        assert_eq!(rests.len(), 3);
    }

    #[test]
    fn sequence_members_spread_across_the_slot() {
        let score = single_beat_score(vec![
            Note::new(60, DurationClass::Eighth),
            Note::new(64, DurationClass::Eighth),
        ]);
        let (notes, _) = place(&score);
        assert!(notes[1].x > notes[0].x);
        assert_eq!(notes[0].start_beat, 1.0);
        assert_eq!(notes[1].start_beat, 1.25);
    }

    #[test]
    fn stems_flip_at_the_middle_line() {
        let score = single_beat_score(vec![
            Note::new(69, DurationClass::Quarter), // A4, position 3
            Note::new(71, DurationClass::Quarter), // B4, middle line
        ]);
        let (notes, _) = place(&score);
        assert!(notes[0].stem_up);
        assert!(!notes[1].stem_up);
        assert_eq!(notes[0].stem_end_y, Some(notes[0].y - 30.0));
        assert_eq!(notes[1].stem_end_y, Some(notes[1].y + 30.0));
    }

    #[test]
    fn whole_notes_have_no_stem() {
        let score = single_beat_score(vec![Note::new(60, DurationClass::Whole)]);
        let (notes, _) = place(&score);
        assert_eq!(notes[0].stem_end_y, None);
        assert_eq!(notes[0].ledger_lines.len(), 1);
        assert!(!notes[0].filled);
    }

    #[test]
    fn notehead_fill_follows_duration() {
        let score = single_beat_score(vec![
            Note::new(60, DurationClass::Half),
            Note::new(64, DurationClass::Quarter),
        ]);
        let (notes, _) = place(&score);
        assert!(!notes[0].filled);
        assert!(notes[1].filled);
    }

    #[test]
    fn pitches_off_the_keyboard_are_still_placed() {
        // C0 sits below A0; no clamping, just more ledger lines
        let score = single_beat_score(vec![Note::new(12, DurationClass::Quarter)]);
        let (notes, _) = place(&score);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].ledger_lines.len() > 5);
    }

    #[test]
    fn note_hand_overrides_track_hand() {
        let mut n = Note::new(60, DurationClass::Quarter);
        n.hand = Some(Hand::Left);
        let score = single_beat_score(vec![n, Note::new(64, DurationClass::Quarter)]);
        let (notes, _) = place(&score);
        assert_eq!(notes[0].hand, Hand::Left);
        assert_eq!(notes[1].hand, Hand::Right);
    }
}
