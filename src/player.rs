//! Playback scheduler — a {Stopped, Playing, Paused} state machine driven
//! by a single `tick(now)` entry point.
//!
//! `now` is any monotonic time (the real-time driver passes the elapsed time
//! since it started; tests pass synthetic values). Every tick recomputes the
//! playhead as `start_offset + (now - origin)` rather than summing per-tick
//! deltas, so long sessions do not drift. The origin is re-anchored on play,
//! seek, loop wrap and tempo changes.
//!
//! Not reentrant: one caller (the driver thread, or a test) owns the player.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;
use crate::device::SoundDevice;
use crate::model::{Hand, Position, Score};
use crate::schedule::{build_schedule_at, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// Which hands reach the sound device. Filtered notes still advance the
/// playhead and still highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    Both,
    RightOnly,
    LeftOnly,
}

impl PlayMode {
    /// Notes without a hand are heard in every mode.
    pub fn is_audible(self, hand: Hand) -> bool {
        match (self, hand) {
            (PlayMode::Both, _) | (_, Hand::None) => true,
            (PlayMode::RightOnly, Hand::Right) | (PlayMode::LeftOnly, Hand::Left) => true,
            _ => false,
        }
    }
}

/// Inclusive range of 0-based measure indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRange {
    pub start_measure: usize,
    pub end_measure: usize,
}

/// What the UI shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub state: PlayState,
    pub is_playing: bool,
    /// Seconds at the effective tempo
    pub current_time: f64,
    pub total_duration: f64,
    pub current_measure: usize,
    /// Notes currently sounding, including ones muted by the play mode
    pub sounding: Vec<Position>,
}

pub struct Player {
    config: PlayerConfig,
    device: Box<dyn SoundDevice>,
    score: Option<Score>,
    schedule: Schedule,
    tempo_bpm: f64,
    speed: f64,
    mode: PlayMode,
    loop_range: Option<LoopRange>,

    state: PlayState,
    current_time: f64,
    start_offset: f64,
    origin: Option<Duration>,
    last_now: Option<Duration>,
    next_entry: usize,
    /// Indices into `schedule.entries`
    sounding: Vec<usize>,
    /// Last beat a click was fired for
    last_beat: i64,
    ticks: u64,
}

impl Player {
    pub fn new(device: impl SoundDevice + 'static) -> Self {
        Self::with_config(device, PlayerConfig::default())
    }

    pub fn with_config(device: impl SoundDevice + 'static, config: PlayerConfig) -> Self {
        Self {
            config,
            device: Box::new(device),
            score: None,
            schedule: Schedule::empty(),
            tempo_bpm: 0.0,
            speed: 1.0,
            mode: PlayMode::Both,
            loop_range: None,
            state: PlayState::Stopped,
            current_time: 0.0,
            start_offset: 0.0,
            origin: None,
            last_now: None,
            next_entry: 0,
            sounding: Vec::new(),
            last_beat: -1,
            ticks: 0,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    /// Index of the next schedule entry to fire.
    pub fn next_entry(&self) -> usize {
        self.next_entry
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn tempo(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn play_mode(&self) -> PlayMode {
        self.mode
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.loop_range
    }

    pub fn sounding(&self) -> Vec<Position> {
        self.sounding
            .iter()
            .filter_map(|&i| self.schedule.entries.get(i).map(|e| e.position))
            .collect()
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            state: self.state,
            is_playing: self.is_playing(),
            current_time: self.current_time,
            total_duration: self.schedule.total_duration,
            current_measure: self.schedule.measure_at(self.current_time),
            sounding: self.sounding(),
        }
    }

    // ── Transport ───────────────────────────────────────────────────

    /// Load a score, stopping any playback. Tempo resets to the score's
    /// nominal tempo; the speed multiplier and play mode are kept.
    pub fn load(&mut self, score: Score) {
        self.tempo_bpm = score.tempo_bpm;
        self.score = Some(score);
        self.rebuild();
        if let Some(range) = self.loop_range {
            if range.end_measure >= self.schedule.measure_count {
                self.loop_range = None;
            }
        }
        self.state = PlayState::Stopped;
        self.relocate(0.0);
        log::debug!(
            target: "playback",
            "loaded {} entries, {:.3}s",
            self.schedule.entries.len(), self.schedule.total_duration
        );
    }

    pub fn play(&mut self) {
        if self.state == PlayState::Playing {
            return;
        }
        if self.schedule.total_duration <= 0.0 {
            log::debug!(target: "playback", "nothing to play");
            return;
        }
        if self.current_time >= self.schedule.total_duration {
            self.relocate(0.0);
        }
        self.state = PlayState::Playing;
        self.start_offset = self.current_time;
        // Anchored by the first tick, so paused time is not counted.
        self.origin = None;
        self.last_now = None;
        log::debug!(target: "playback", "play from {:.3}s", self.current_time);
    }

    pub fn pause(&mut self) {
        if self.state != PlayState::Playing {
            return;
        }
        self.state = PlayState::Paused;
        self.origin = None;
        self.last_now = None;
        log::debug!(target: "playback", "pause at {:.3}s", self.current_time);
    }

    /// Stop and rewind to the start.
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.relocate(0.0);
        log::debug!(target: "playback", "stop");
    }

    /// Jump to `time` seconds. Playback continues if it was running.
    pub fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        let mut target = time.clamp(0.0, self.schedule.total_duration);
        if let Some((loop_start, loop_end)) = self.loop_bounds() {
            if target >= loop_end {
                target = loop_start;
            }
        }
        self.relocate(target);
        self.reanchor();
        log::debug!(target: "playback", "seek to {:.3}s", target);
    }

    pub fn set_speed_multiplier(&mut self, speed: f64) {
        if !(speed.is_finite() && speed > 0.0) {
            log::debug!(target: "playback", "ignoring speed {speed}");
            return;
        }
        self.retime(|p| p.speed = speed);
    }

    /// Override the tempo (before the speed multiplier).
    pub fn set_tempo(&mut self, tempo_bpm: f64) {
        if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            log::debug!(target: "playback", "ignoring tempo {tempo_bpm}");
            return;
        }
        self.retime(|p| p.tempo_bpm = tempo_bpm);
    }

    /// Loop measures `start..=end` (0-based). Invalid ranges are ignored.
    pub fn set_loop_range(&mut self, start_measure: usize, end_measure: usize) {
        if start_measure > end_measure || end_measure >= self.schedule.measure_count {
            log::debug!(
                target: "playback",
                "ignoring loop range {start_measure}..={end_measure} of {} measures",
                self.schedule.measure_count
            );
            return;
        }
        self.loop_range = Some(LoopRange { start_measure, end_measure });
    }

    pub fn clear_loop(&mut self) {
        self.loop_range = None;
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    pub fn set_metronome(&mut self, enabled: bool) {
        self.config.metronome = enabled;
    }

    // ── Clock ───────────────────────────────────────────────────────

    /// Advance to monotonic time `now`. Returns a UI snapshot every
    /// `publish_every` ticks while playing, and always on the tick that
    /// reaches the end of the score.
    pub fn tick(&mut self, now: Duration) -> Option<PlaybackState> {
        if self.state != PlayState::Playing {
            return None;
        }
        self.ticks += 1;
        let origin = *self.origin.get_or_insert(now);
        self.last_now = Some(now);
        let mut current = self.start_offset + now.saturating_sub(origin).as_secs_f64();

        let loop_bounds = self.loop_bounds();
        match loop_bounds {
            Some((loop_start, loop_end)) if current >= loop_end => {
                self.wrap_to(loop_start, now);
                current = loop_start;
            }
            None if current >= self.schedule.total_duration => {
                self.finish();
                return Some(self.state());
            }
            _ => {}
        }
        self.current_time = current;

        // Retire notes that have ended.
        let entries = &self.schedule.entries;
        self.sounding.retain(|&i| entries[i].end() > current);

        self.fire_due(current, loop_bounds.map(|(_, end)| end));
        self.click_metronome(current);

        let every = u64::from(self.config.publish_every.max(1));
        (self.ticks % every == 0).then(|| self.state())
    }

    fn fire_due(&mut self, current: f64, loop_end: Option<f64>) {
        let horizon = current + self.config.lookahead_secs();
        while let Some(entry) = self.schedule.entries.get(self.next_entry) {
            if entry.start > horizon || loop_end.map_or(false, |end| entry.start >= end) {
                break;
            }
            if self.mode.is_audible(entry.hand) {
                log::trace!(target: "playback", "note {} at {:.3}s", entry.pitch, entry.start);
                if let Err(err) = self.device.play_note(entry.pitch, entry.hand) {
                    log::warn!(target: "playback", "sound device failed: {err}");
                }
            }
            self.sounding.push(self.next_entry);
            self.next_entry += 1;
        }
    }

    fn click_metronome(&mut self, current: f64) {
        let beat_duration = self.schedule.beat_duration;
        if beat_duration <= 0.0 {
            return;
        }
        let beat = (current / beat_duration).floor() as i64;
        if beat == self.last_beat {
            return;
        }
        self.last_beat = beat;
        if !self.config.metronome {
            return;
        }
        let strong = beat.rem_euclid(i64::from(self.schedule.beats_per_measure.max(1))) == 0;
        if let Err(err) = self.device.play_metronome_click(strong) {
            log::warn!(target: "playback", "sound device failed: {err}");
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn effective_tempo(&self) -> f64 {
        self.tempo_bpm * self.speed
    }

    fn rebuild(&mut self) {
        self.schedule = match &self.score {
            Some(score) => build_schedule_at(score, self.effective_tempo()),
            None => Schedule::empty(),
        };
    }

    /// Rebuild at a new tempo or speed, keeping relative progress.
    fn retime(&mut self, change: impl FnOnce(&mut Self)) {
        let old_total = self.schedule.total_duration;
        let progress = if old_total > 0.0 { self.current_time / old_total } else { 0.0 };

        change(self);
        self.rebuild();

        let new_time = progress * self.schedule.total_duration;
        self.current_time = new_time;
        // Rescaling keeps entry order, so the fired/sounding indices still
        // refer to the same notes.
        let len = self.schedule.entries.len();
        self.next_entry = self.next_entry.min(len);
        self.sounding.retain(|&i| i < len);
        self.reanchor();
        log::debug!(
            target: "playback",
            "retimed to {:.1} bpm x{:.2}, {:.3}s",
            self.tempo_bpm, self.speed, new_time
        );
    }

    /// Move the playhead without touching the transport state.
    fn relocate(&mut self, time: f64) {
        self.current_time = time;
        self.start_offset = time;
        self.next_entry = self.schedule.first_at_or_after(time);
        self.sounding.clear();
        self.last_beat = self.beat_before(time);
        self.origin = None;
    }

    /// Restart elapsed-time measurement at the current playhead. While
    /// playing, the last tick since `play()` is the reference; before that
    /// tick the next one anchors.
    fn reanchor(&mut self) {
        self.start_offset = self.current_time;
        self.origin = if self.is_playing() { self.last_now } else { None };
    }

    fn wrap_to(&mut self, loop_start: f64, now: Duration) {
        log::debug!(target: "playback", "loop back to {:.3}s", loop_start);
        self.relocate(loop_start);
        self.origin = Some(now);
    }

    fn finish(&mut self) {
        self.state = PlayState::Stopped;
        self.current_time = self.schedule.total_duration;
        self.start_offset = self.current_time;
        self.next_entry = self.schedule.entries.len();
        self.sounding.clear();
        self.origin = None;
        self.last_now = None;
        log::debug!(target: "playback", "reached end at {:.3}s", self.current_time);
    }

    /// Beat marker such that the next tick at `time` clicks only if `time`
    /// sits exactly on a beat.
    fn beat_before(&self, time: f64) -> i64 {
        let bd = self.schedule.beat_duration;
        if bd <= 0.0 {
            return -1;
        }
        let beats = time / bd;
        let floor = beats.floor();
        if (beats - floor).abs() < 1e-9 {
            floor as i64 - 1
        } else {
            floor as i64
        }
    }

    fn loop_bounds(&self) -> Option<(f64, f64)> {
        let range = self.loop_range?;
        Some((
            self.schedule.measure_start(range.start_measure),
            self.schedule.measure_start(range.end_measure + 1),
        ))
    }
}
