//! Beam grouping.

use crate::config::RenderConfig;
use crate::model::Position;
use super::notes::stem_x;
use super::pitch::MIDDLE_LINE;
use super::{BeamGroup, NotePlacement};

/// Whether `next` continues a beam run ending at `prev`: same track and
/// line, and no empty beat slot (a rest) in between. Barlines do not break
/// a run.
fn continues_run(prev: &NotePlacement, next: &NotePlacement, beats_per_measure: usize) -> bool {
    let (p, n) = (&prev.position, &next.position);
    let slot = |pos: &Position| pos.measure * beats_per_measure + pos.beat;
    p.track == n.track && prev.line == next.line && slot(n) <= slot(p) + 1
}

/// Find beam groups: runs of two or more consecutive sequence-class notes,
/// broken by rests and by chord-class notes. Members get the group's stem
/// direction and their stems end on the beam.
pub(super) fn group_beams(
    notes: &mut [NotePlacement],
    beats_per_measure: usize,
    config: &RenderConfig,
) -> Vec<BeamGroup> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for i in 0..notes.len() {
        let note = &notes[i];
        if note.duration.beam_weight() == 0 {
            if current.len() >= 2 {
                runs.push(std::mem::take(&mut current));
            }
            current.clear();
            continue;
        }
        if let Some(&last) = current.last() {
            if !continues_run(&notes[last], note, beats_per_measure) {
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
        current.push(i);
    }
    if current.len() >= 2 {
        runs.push(current);
    }

    runs.into_iter()
        .enumerate()
        .map(|(index, members)| build_group(index, members, notes, config))
        .collect()
}

fn build_group(
    index: usize,
    members: Vec<usize>,
    notes: &mut [NotePlacement],
    config: &RenderConfig,
) -> BeamGroup {
    let count = members.len() as f64;
    let avg_position = members.iter().map(|&i| notes[i].staff_position as f64).sum::<f64>() / count;
    let stem_up = avg_position < MIDDLE_LINE as f64;

    let beam_count = members
        .iter()
        .map(|&i| notes[i].duration.beam_weight())
        .min()
        .unwrap_or(1);

    // Horizontal beam anchored on the most extreme note.
    let y = if stem_up {
        let highest = members.iter().map(|&i| notes[i].y).fold(f64::INFINITY, f64::min);
        highest - config.stem_length
    } else {
        let lowest = members.iter().map(|&i| notes[i].y).fold(f64::NEG_INFINITY, f64::max);
        lowest + config.stem_length
    };

    for &i in &members {
        let note = &mut notes[i];
        note.stem_up = stem_up;
        note.stem_x = stem_x(note.x, stem_up);
        note.stem_end_y = Some(y);
        note.beam_group = Some(index);
    }

    let first = &notes[members[0]];
    let last = &notes[members[members.len() - 1]];

    BeamGroup {
        index,
        track: first.position.track,
        line: first.line,
        x_start: first.stem_x,
        x_end: last.stem_x,
        notes: members,
        beam_count,
        stem_up,
        y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{layout, LayoutResult};
    use crate::model::*;

    fn run_measures(measures: Vec<Vec<Beat>>) -> LayoutResult {
        let mut score = Score::new(120.0);
        let mut track = Track::new("rh", "Right", Clef::Treble, Hand::Right);
        for (i, beats) in measures.into_iter().enumerate() {
            let mut m = Measure::new(i as u32 + 1);
            m.beats = beats;
            track.measures.push(m);
        }
        score.tracks.push(track);
        layout(&score, &RenderConfig::default())
    }

    fn run_score(beats: Vec<Beat>) -> LayoutResult {
        run_measures(vec![beats])
    }

    fn eighths(index: usize, pitches: &[u8]) -> Beat {
        Beat::new(index, pitches.iter().map(|&p| Note::new(p, DurationClass::Eighth)).collect())
    }

    #[test]
    fn consecutive_eighths_form_one_group() {
        let result = run_score(vec![eighths(0, &[60, 62]), eighths(1, &[64, 65])]);
        assert_eq!(result.beams.len(), 1);
        assert_eq!(result.beams[0].notes, vec![0, 1, 2, 3]);
        assert_eq!(result.beams[0].beam_count, 1);
        assert!(result.notes.iter().all(|n| n.beam_group == Some(0)));
    }

    #[test]
    fn rest_and_chord_notes_break_runs() {
        let result = run_score(vec![
            eighths(0, &[60, 62]),
            // beat 1 empty
            eighths(2, &[64]),
            Beat::new(3, vec![Note::new(67, DurationClass::Quarter), Note::new(65, DurationClass::Eighth)]),
        ]);
        // [60, 62] only; 64 is alone, the quarter separates it from 65
        assert_eq!(result.beams.len(), 1);
        assert_eq!(result.beams[0].notes, vec![0, 1]);
        assert_eq!(result.notes[2].beam_group, None);
    }

    #[test]
    fn runs_continue_across_a_barline() {
        let result = run_measures(vec![
            vec![Beat::new(0, vec![Note::new(60, DurationClass::Half)]), eighths(2, &[62]), eighths(3, &[64, 65])],
            vec![eighths(0, &[67, 69]), Beat::new(1, vec![Note::new(71, DurationClass::Quarter)])],
        ]);
        assert_eq!(result.notes[1].line, result.notes[5].line);
        assert_eq!(result.beams.len(), 1);
        assert_eq!(result.beams[0].notes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn rest_at_the_end_of_a_measure_breaks_the_run() {
        let result = run_measures(vec![
            vec![eighths(2, &[62, 64])],
            vec![eighths(0, &[67, 69])],
        ]);
        assert_eq!(result.beams.len(), 2);
        assert_eq!(result.beams[0].notes, vec![0, 1]);
        assert_eq!(result.beams[1].notes, vec![2, 3]);
    }

    #[test]
    fn mixed_run_beams_at_the_shallowest_level() {
        let result = run_score(vec![Beat::new(0, vec![
            Note::new(60, DurationClass::Eighth),
            Note::new(62, DurationClass::Sixteenth),
            Note::new(64, DurationClass::Sixteenth),
        ])]);
        assert_eq!(result.beams[0].beam_count, 1);
    }

    #[test]
    fn low_run_stems_up_from_the_highest_note() {
        let result = run_score(vec![eighths(0, &[60, 67])]);
        let group = &result.beams[0];
        assert!(group.stem_up);
        let highest = result.notes[1].y;
        assert_eq!(group.y, highest - 30.0);
        assert!(result.notes.iter().all(|n| n.stem_end_y == Some(group.y)));
    }

    #[test]
    fn high_run_stems_down_from_the_lowest_note() {
        let result = run_score(vec![eighths(0, &[72, 79])]);
        let group = &result.beams[0];
        assert!(!group.stem_up);
        assert_eq!(group.y, result.notes[0].y + 30.0);
    }

    #[test]
    fn average_position_decides_mixed_direction() {
        // C4 (-2) and G5 (9): average 3.5 is below the middle line
        let result = run_score(vec![eighths(0, &[60, 79])]);
        assert!(result.beams[0].stem_up);
    }
}
