//! Score editing with undo/redo.
//!
//! Every edit is an `EditCommand` applied to an immutable `Score`, producing
//! a new score plus the command that reverses it. The `Editor` keeps the
//! current snapshot and the two history stacks; the layout engine and the
//! player are only ever handed `Editor::score()`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};
use crate::model::*;

/// A reversible edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    /// Insert at `at.note` within the beat, or append when it is -1. The
    /// beat is created if the slot is empty.
    InsertNote { at: Position, note: Note },
    /// Remove the note at `at`. A beat left empty is removed.
    DeleteNote { at: Position },
    /// Insert a blank measure at `index` in every track long enough to
    /// receive it.
    InsertMeasure { index: usize },
    /// Remove measure `index` from every track that has it.
    DeleteMeasure { index: usize },
    /// Put back measures removed by `DeleteMeasure`, as (track, measure).
    RestoreMeasure { index: usize, measures: Vec<(usize, Measure)> },
    /// Append `measure` to the end of one track only.
    PushMeasure { track: usize, measure: Measure },
    /// Remove the last measure of one track.
    PopMeasure { track: usize },
    SetTempo { tempo_bpm: f64 },
    SetKey { key: KeySignature },
    /// Applied in order, undone in reverse.
    Batch { commands: Vec<EditCommand> },
}

impl EditCommand {
    /// Apply to `score`, returning the edited copy and the inverse command.
    pub fn apply(&self, score: &Score) -> Result<(Score, EditCommand)> {
        let mut next = score.clone();
        let inverse = self.apply_in_place(&mut next)?;
        Ok((next, inverse))
    }

    fn apply_in_place(&self, score: &mut Score) -> Result<EditCommand> {
        match self {
            EditCommand::InsertNote { at, note } => insert_note(score, *at, note.clone()),
            EditCommand::DeleteNote { at } => delete_note(score, *at),
            EditCommand::InsertMeasure { index } => insert_measure(score, *index),
            EditCommand::DeleteMeasure { index } => delete_measure(score, *index),
            EditCommand::RestoreMeasure { index, measures } => {
                for (ti, measure) in measures {
                    let track = score.tracks.get_mut(*ti).ok_or(ScoreError::TrackOutOfRange(*ti))?;
                    if *index > track.measures.len() {
                        return Err(ScoreError::MeasureOutOfRange { track: *ti, measure: *index });
                    }
                    track.measures.insert(*index, measure.clone());
                    renumber(track);
                }
                Ok(EditCommand::DeleteMeasure { index: *index })
            }
            EditCommand::PushMeasure { track, measure } => {
                let t = score.tracks.get_mut(*track).ok_or(ScoreError::TrackOutOfRange(*track))?;
                t.measures.push(measure.clone());
                renumber(t);
                Ok(EditCommand::PopMeasure { track: *track })
            }
            EditCommand::PopMeasure { track } => {
                let t = score.tracks.get_mut(*track).ok_or(ScoreError::TrackOutOfRange(*track))?;
                let measure = t
                    .measures
                    .pop()
                    .ok_or(ScoreError::MeasureOutOfRange { track: *track, measure: 0 })?;
                Ok(EditCommand::PushMeasure { track: *track, measure })
            }
            EditCommand::SetTempo { tempo_bpm } => {
                if !(tempo_bpm.is_finite() && *tempo_bpm > 0.0) {
                    return Err(ScoreError::InvalidConfig(format!("tempo must be positive, got {tempo_bpm}")));
                }
                let previous = std::mem::replace(&mut score.tempo_bpm, *tempo_bpm);
                Ok(EditCommand::SetTempo { tempo_bpm: previous })
            }
            EditCommand::SetKey { key } => {
                let previous = std::mem::replace(&mut score.key, *key);
                Ok(EditCommand::SetKey { key: previous })
            }
            EditCommand::Batch { commands } => {
                // A failure part way leaves `score` half edited; callers
                // only ever pass a scratch copy.
                let mut inverses = Vec::with_capacity(commands.len());
                for cmd in commands {
                    inverses.push(cmd.apply_in_place(score)?);
                }
                inverses.reverse();
                Ok(EditCommand::Batch { commands: inverses })
            }
        }
    }
}

fn renumber(track: &mut Track) {
    for (i, measure) in track.measures.iter_mut().enumerate() {
        measure.number = i as u32 + 1;
    }
}

fn measure_mut(score: &mut Score, at: Position) -> Result<&mut Measure> {
    let track = score.tracks.get_mut(at.track).ok_or(ScoreError::TrackOutOfRange(at.track))?;
    track
        .measures
        .get_mut(at.measure)
        .ok_or(ScoreError::MeasureOutOfRange { track: at.track, measure: at.measure })
}

fn insert_note(score: &mut Score, at: Position, note: Note) -> Result<EditCommand> {
    let beats_per_measure = score.time.beats;
    if at.beat >= beats_per_measure as usize {
        return Err(ScoreError::BeatOutOfRange { beat: at.beat, beats_per_measure });
    }
    let measure = measure_mut(score, at)?;

    if measure.beat(at.beat).is_none() {
        let slot = measure.beats.partition_point(|b| b.index < at.beat);
        measure.beats.insert(slot, Beat::new(at.beat, Vec::new()));
    }
    let beat = measure
        .beat_mut(at.beat)
        .ok_or(ScoreError::NoteOutOfRange(at))?;

    let index = match at.note_index() {
        None => beat.notes.len(),
        Some(i) if i <= beat.notes.len() => i,
        Some(_) => return Err(ScoreError::NoteOutOfRange(at)),
    };
    beat.notes.insert(index, note);
    Ok(EditCommand::DeleteNote { at: Position::note(at.track, at.measure, at.beat, index) })
}

fn delete_note(score: &mut Score, at: Position) -> Result<EditCommand> {
    let measure = measure_mut(score, at)?;
    let index = at.note_index().ok_or(ScoreError::NoteOutOfRange(at))?;
    let beat = measure
        .beat_mut(at.beat)
        .filter(|b| index < b.notes.len())
        .ok_or(ScoreError::NoteOutOfRange(at))?;

    let note = beat.notes.remove(index);
    if beat.notes.is_empty() {
        measure.beats.retain(|b| b.index != at.beat);
    }
    Ok(EditCommand::InsertNote { at, note })
}

fn insert_measure(score: &mut Score, index: usize) -> Result<EditCommand> {
    if index > score.measure_count() {
        return Err(ScoreError::MeasureOutOfRange { track: 0, measure: index });
    }
    for track in &mut score.tracks {
        if index <= track.measures.len() {
            track.measures.insert(index, Measure::new(index as u32 + 1));
            renumber(track);
        }
    }
    Ok(EditCommand::DeleteMeasure { index })
}

fn delete_measure(score: &mut Score, index: usize) -> Result<EditCommand> {
    if index >= score.measure_count() {
        return Err(ScoreError::MeasureOutOfRange { track: 0, measure: index });
    }
    let mut removed = Vec::new();
    for (ti, track) in score.tracks.iter_mut().enumerate() {
        if index < track.measures.len() {
            removed.push((ti, track.measures.remove(index)));
            renumber(track);
        }
    }
    Ok(EditCommand::RestoreMeasure { index, measures: removed })
}

struct HistoryEntry {
    forward: EditCommand,
    inverse: EditCommand,
}

/// Current score plus undo/redo history.
pub struct Editor {
    score: Score,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl Editor {
    pub fn new(score: Score) -> Self {
        Self { score, undo_stack: Vec::new(), redo_stack: Vec::new() }
    }

    /// The latest snapshot.
    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn into_score(self) -> Score {
        self.score
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Apply an edit. A failed edit leaves the score and history untouched.
    pub fn apply(&mut self, command: EditCommand) -> Result<&Score> {
        let (next, inverse) = command.apply(&self.score)?;
        self.score = next;
        self.undo_stack.push(HistoryEntry { forward: command, inverse });
        self.redo_stack.clear();
        Ok(&self.score)
    }

    pub fn undo(&mut self) -> Result<&Score> {
        let entry = self.undo_stack.pop().ok_or(ScoreError::NothingToUndo)?;
        match entry.inverse.apply(&self.score) {
            Ok((previous, _)) => {
                self.score = previous;
                self.redo_stack.push(entry);
                Ok(&self.score)
            }
            Err(err) => {
                self.undo_stack.push(entry);
                Err(err)
            }
        }
    }

    pub fn redo(&mut self) -> Result<&Score> {
        let entry = self.redo_stack.pop().ok_or(ScoreError::NothingToRedo)?;
        match entry.forward.apply(&self.score) {
            Ok((next, inverse)) => {
                self.score = next;
                self.undo_stack.push(HistoryEntry { forward: entry.forward, inverse });
                Ok(&self.score)
            }
            Err(err) => {
                self.redo_stack.push(entry);
                Err(err)
            }
        }
    }

    /// Insert a note, carrying a beat slot past the end of its measure into
    /// the following measures and creating them as needed. One undo step.
    /// Returns where the note landed.
    ///
    /// A track shorter than the score is padded on its own; only measures
    /// past the end of the score are inserted across tracks.
    pub fn insert_note_advancing(&mut self, at: Position, note: Note) -> Result<Position> {
        let beats_per_measure = self.score.time.beats as usize;
        if beats_per_measure == 0 {
            return Err(ScoreError::BeatOutOfRange { beat: at.beat, beats_per_measure: 0 });
        }
        let track_len = self
            .score
            .track(at.track)
            .ok_or(ScoreError::TrackOutOfRange(at.track))?
            .measures
            .len();
        if at.measure >= track_len {
            return Err(ScoreError::MeasureOutOfRange { track: at.track, measure: at.measure });
        }

        let target = Position {
            measure: at.measure + at.beat / beats_per_measure,
            beat: at.beat % beats_per_measure,
            ..at
        };

        let score_len = self.score.measure_count();
        let mut commands: Vec<EditCommand> = (track_len..=target.measure)
            .map(|index| {
                if index < score_len {
                    EditCommand::PushMeasure { track: at.track, measure: Measure::new(index as u32 + 1) }
                } else {
                    EditCommand::InsertMeasure { index }
                }
            })
            .collect();
        if !commands.is_empty() {
            log::debug!(target: "editor", "advancing into {} new measure(s)", commands.len());
        }
        commands.push(EditCommand::InsertNote { at: target, note });

        self.apply(EditCommand::Batch { commands })?;
        let landed = target.note_index().unwrap_or_else(|| {
            self.score.beat_at(&target).map_or(0, |b| b.notes.len().saturating_sub(1))
        });
        Ok(Position::note(target.track, target.measure, target.beat, landed))
    }
}
