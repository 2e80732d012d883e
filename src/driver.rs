//! Real-time driver: a thread that owns a `Player` and ticks it against the
//! monotonic clock.
//!
//! Callers talk to the thread over a command channel and read UI state from
//! a second channel that holds only the newest snapshot. Pause and stop wait
//! for the thread to acknowledge, so once they return no further note is
//! fired.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::config::PlayerConfig;
use crate::device::SoundDevice;
use crate::error::Result;
use crate::model::Score;
use crate::player::{PlayMode, PlaybackState, Player};

enum Command {
    Load(Box<Score>),
    Play,
    Pause(Sender<()>),
    Stop(Sender<()>),
    Seek(f64),
    SetSpeed(f64),
    SetTempo(f64),
    SetLoop(usize, usize),
    ClearLoop,
    SetMode(PlayMode),
    SetMetronome(bool),
    Shutdown,
}

pub struct PlaybackDriver {
    cmd_tx: Sender<Command>,
    state_rx: Receiver<PlaybackState>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    pub fn spawn(device: impl SoundDevice + 'static, config: PlayerConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (state_tx, state_rx) = crossbeam_channel::bounded(1);
        let states = StateSlot { tx: state_tx, stale: state_rx.clone() };
        let poll = Duration::from_millis(config.poll_interval_ms.max(1));
        let player = Player::with_config(device, config);

        let handle = thread::Builder::new()
            .name("score-playback".into())
            .spawn(move || run(player, cmd_rx, states, poll))?;

        Ok(Self { cmd_tx, state_rx, handle: Some(handle) })
    }

    pub fn load(&self, score: Score) {
        self.send(Command::Load(Box::new(score)));
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    /// Returns once the playback thread has paused.
    pub fn pause(&self) {
        self.round_trip(Command::Pause);
    }

    /// Returns once the playback thread has stopped.
    pub fn stop(&self) {
        self.round_trip(Command::Stop);
    }

    pub fn seek(&self, time: f64) {
        self.send(Command::Seek(time));
    }

    pub fn set_speed_multiplier(&self, speed: f64) {
        self.send(Command::SetSpeed(speed));
    }

    pub fn set_tempo(&self, tempo_bpm: f64) {
        self.send(Command::SetTempo(tempo_bpm));
    }

    pub fn set_loop_range(&self, start_measure: usize, end_measure: usize) {
        self.send(Command::SetLoop(start_measure, end_measure));
    }

    pub fn clear_loop(&self) {
        self.send(Command::ClearLoop);
    }

    pub fn set_play_mode(&self, mode: PlayMode) {
        self.send(Command::SetMode(mode));
    }

    pub fn set_metronome(&self, enabled: bool) {
        self.send(Command::SetMetronome(enabled));
    }

    /// The newest unread state. Older snapshots are replaced, never queued.
    pub fn states(&self) -> &Receiver<PlaybackState> {
        &self.state_rx
    }

    pub fn latest_state(&self) -> Option<PlaybackState> {
        self.state_rx.try_recv().ok()
    }

    fn send(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            log::warn!(target: "driver", "playback thread is gone");
        }
    }

    fn round_trip(&self, make: impl FnOnce(Sender<()>) -> Command) {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(make(ack_tx));
        // Disconnect means the thread exited, which is just as final.
        let _ = ack_rx.recv();
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!(target: "driver", "playback thread panicked");
            }
        }
    }
}

/// Single-slot state channel. The thread keeps a receiver of its own to
/// evict an unread snapshot before publishing a newer one.
struct StateSlot {
    tx: Sender<PlaybackState>,
    stale: Receiver<PlaybackState>,
}

impl StateSlot {
    fn publish(&self, mut state: PlaybackState) {
        loop {
            match self.tx.try_send(state) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.stale.try_recv();
                    state = back;
                }
            }
        }
    }
}

fn run(mut player: Player, cmd_rx: Receiver<Command>, states: StateSlot, poll: Duration) {
    log::debug!(target: "driver", "playback thread started, polling every {poll:?}");
    let started = Instant::now();
    let mut next_tick = started;

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match cmd_rx.recv_timeout(timeout) {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(cmd) => {
                let ack = apply(&mut player, cmd);
                states.publish(player.state());
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        if now >= next_tick {
            if let Some(state) = player.tick(now.duration_since(started)) {
                states.publish(state);
            }
            next_tick = now + poll;
        }
    }
    log::debug!(target: "driver", "playback thread exiting");
}

/// Returns the acknowledgement channel of a synchronous command.
fn apply(player: &mut Player, cmd: Command) -> Option<Sender<()>> {
    match cmd {
        Command::Load(score) => player.load(*score),
        Command::Play => player.play(),
        Command::Pause(ack) => {
            player.pause();
            return Some(ack);
        }
        Command::Stop(ack) => {
            player.stop();
            return Some(ack);
        }
        Command::Seek(time) => player.seek(time),
        Command::SetSpeed(speed) => player.set_speed_multiplier(speed),
        Command::SetTempo(bpm) => player.set_tempo(bpm),
        Command::SetLoop(start, end) => player.set_loop_range(start, end),
        Command::ClearLoop => player.clear_loop(),
        Command::SetMode(mode) => player.set_play_mode(mode),
        Command::SetMetronome(enabled) => player.set_metronome(enabled),
        Command::Shutdown => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;
    use crate::model::*;

    fn fast_score() -> Score {
        let mut score = Score::new(600.0);
        let mut track = Track::new("m", "Melody", Clef::Treble, Hand::None);
        for m in 0..4 {
            let mut measure = Measure::new(m + 1);
            for b in 0..4 {
                measure.beats.push(Beat::new(b, vec![Note::new(60 + b as u8, DurationClass::Quarter)]));
            }
            track.measures.push(measure);
        }
        score.tracks.push(track);
        score
    }

    #[test]
    fn nothing_fires_after_pause_returns() {
        let device = RecordingDevice::new();
        let driver = PlaybackDriver::spawn(device.clone(), PlayerConfig::default()).unwrap();
        driver.load(fast_score());
        driver.play();
        thread::sleep(Duration::from_millis(150));
        driver.pause();

        let fired = device.notes().len();
        assert!(fired > 0, "expected some notes before pausing");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(device.notes().len(), fired);

        let state = driver.latest_state().expect("state published on pause");
        assert!(!state.is_playing);
    }

    #[test]
    fn unread_states_do_not_pile_up() {
        let driver = PlaybackDriver::spawn(RecordingDevice::new(), PlayerConfig::default()).unwrap();
        driver.load(fast_score());
        driver.play();
        thread::sleep(Duration::from_millis(200));
        assert!(driver.states().len() <= 1, "{} states queued", driver.states().len());

        driver.pause();
        let state = driver.latest_state().expect("pause publishes its state");
        assert!(!state.is_playing);
        assert!(driver.latest_state().is_none());
    }

    #[test]
    fn drop_joins_the_thread() {
        let driver = PlaybackDriver::spawn(RecordingDevice::new(), PlayerConfig::default()).unwrap();
        driver.load(fast_score());
        driver.play();
        drop(driver);
    }
}
