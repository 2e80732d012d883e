//! Playback tests — schedule timing and the player state machine, driven by
//! synthetic clock values.

use std::time::Duration;

use pretty_assertions::assert_eq;
use scoreengine::device::DeviceEvent;
use scoreengine::{build_schedule, build_schedule_at, PlayMode, PlayState, Player, RecordingDevice};
use scoreengine::{Beat, Clef, DurationClass, Hand, Measure, Note, Position, Score, Track};

const EPS: f64 = 1e-9;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn one_beat_score(notes: Vec<Note>) -> Score {
    let mut score = Score::new(120.0);
    let mut track = Track::new("m", "Melody", Clef::Treble, Hand::None);
    let mut m = Measure::new(1);
    m.beats.push(Beat::new(0, notes));
    track.measures.push(m);
    score.tracks.push(track);
    score
}

fn four_quarters(measures: u32) -> Score {
    let mut score = Score::new(120.0);
    let mut track = Track::new("m", "Melody", Clef::Treble, Hand::None);
    for n in 1..=measures {
        let mut m = Measure::new(n);
        for (b, pitch) in [60u8, 62, 64, 65].into_iter().enumerate() {
            m.beats.push(Beat::new(b, vec![Note::new(pitch, DurationClass::Quarter)]));
        }
        track.measures.push(m);
    }
    score.tracks.push(track);
    score
}

/// Right hand plays quarters, left hand holds a whole note each measure.
fn two_hands() -> Score {
    let mut score = four_quarters(2);
    score.tracks[0].hand = Hand::Right;
    let mut lh = Track::new("lh", "Left", Clef::Bass, Hand::Left);
    for n in 1..=2 {
        let mut m = Measure::new(n);
        m.beats.push(Beat::new(0, vec![Note::new(48, DurationClass::Whole)]));
        lh.measures.push(m);
    }
    score.tracks.push(lh);
    score
}

fn run(player: &mut Player, from_ms: u64, to_ms: u64) {
    for t in (from_ms..=to_ms).step_by(16) {
        player.tick(ms(t));
    }
}

#[test]
fn four_quarters_at_120_bpm() {
    let schedule = build_schedule(&four_quarters(1));
    let starts: Vec<f64> = schedule.entries.iter().map(|e| e.start).collect();
    let pitches: Vec<u8> = schedule.entries.iter().map(|e| e.pitch).collect();
    assert_eq!(starts, vec![0.0, 0.5, 1.0, 1.5]);
    assert_eq!(pitches, vec![60, 62, 64, 65]);
    assert!(schedule.entries.iter().all(|e| e.duration == 0.5));
    assert_eq!(schedule.total_duration, 2.0);
}

#[test]
fn eighths_in_one_beat_play_in_thirds() {
    let schedule = build_schedule(&one_beat_score(vec![
        Note::new(60, DurationClass::Eighth),
        Note::new(64, DurationClass::Eighth),
        Note::new(67, DurationClass::Eighth),
    ]));
    let expected = [0.0, 0.25 / 3.0, 0.5 / 3.0];
    for (entry, want) in schedule.entries.iter().zip(expected) {
        assert!((entry.start - want).abs() < EPS, "pitch {} starts at {}", entry.pitch, entry.start);
        assert!((entry.duration - 0.25).abs() < EPS);
    }
    let pitches: Vec<u8> = schedule.entries.iter().map(|e| e.pitch).collect();
    assert_eq!(pitches, vec![60, 64, 67]);
    println!("✓ Eighths at {:?}", schedule.entries.iter().map(|e| e.start).collect::<Vec<_>>());
}

#[test]
fn quarters_in_one_beat_form_a_chord() {
    for tempo in [40.0, 120.0, 233.0] {
        let mut score = one_beat_score(vec![
            Note::new(36, DurationClass::Quarter),
            Note::new(48, DurationClass::Quarter),
            Note::new(52, DurationClass::Quarter),
        ]);
        score.tempo_bpm = tempo;
        let schedule = build_schedule(&score);
        assert_eq!(schedule.entries.len(), 3);
        assert!(schedule.entries.iter().all(|e| e.start == 0.0), "tempo {tempo}");
    }
}

#[test]
fn doubling_tempo_halves_everything() {
    let score = two_hands();
    let nominal = build_schedule(&score);
    let doubled = build_schedule_at(&score, score.tempo_bpm * 2.0);

    assert_eq!(nominal.entries.len(), doubled.entries.len());
    for (a, b) in nominal.entries.iter().zip(&doubled.entries) {
        assert_eq!(a.position, b.position, "order changed");
        assert!((a.start / 2.0 - b.start).abs() < EPS);
        assert!((a.duration / 2.0 - b.duration).abs() < EPS);
    }
    assert!((nominal.total_duration / 2.0 - doubled.total_duration).abs() < EPS);
}

#[test]
fn simultaneous_notes_keep_track_order() {
    let schedule = build_schedule(&two_hands());
    let first_two: Vec<Position> = schedule.entries.iter().take(2).map(|e| e.position).collect();
    assert_eq!(first_two, vec![Position::note(0, 0, 0, 0), Position::note(1, 0, 0, 0)]);
}

#[test]
fn seeking_to_loop_end_wraps_to_loop_start() {
    let device = RecordingDevice::new();
    let mut player = Player::new(device.clone());
    player.load(four_quarters(4));
    player.set_loop_range(1, 2);
    player.play();
    run(&mut player, 0, 2_300);
    assert!(!player.sounding().is_empty());

    let loop_end = player.schedule().measure_start(3);
    let loop_start = player.schedule().measure_start(1);
    player.seek(loop_end);

    assert_eq!(player.current_time(), loop_start);
    assert!(player.sounding().is_empty(), "stale notes after wrap: {:?}", player.sounding());
    assert!(player.is_playing());
}

#[test]
fn playing_through_loop_end_restarts_the_clock() {
    let device = RecordingDevice::new();
    let mut player = Player::new(device.clone());
    player.load(four_quarters(3));
    player.set_loop_range(0, 0);
    player.play();

    // Measure 1 lasts 2s; tick past it
    run(&mut player, 0, 2_000);
    assert!(player.current_time() < 0.05, "wrapped to {}", player.current_time());
    player.tick(ms(2_516));
    assert!((player.current_time() - 0.516).abs() < EPS, "clock re-anchored at the wrap");

    // Only measure 1 ever sounds
    assert!(device.notes().len() > 4);
    assert!(device.notes().iter().all(|p| [60, 62, 64, 65].contains(p)));
    assert_eq!(player.state().current_measure, 0);
}

#[test]
fn clear_loop_plays_to_the_end() {
    let mut player = Player::new(RecordingDevice::new());
    player.load(four_quarters(2));
    player.set_loop_range(0, 0);
    player.clear_loop();
    player.play();
    run(&mut player, 0, 4_100);
    assert_eq!(player.play_state(), PlayState::Stopped);
    assert_eq!(player.current_time(), 4.0);
}

#[test]
fn play_mode_mutes_but_still_highlights() {
    let device = RecordingDevice::new();
    let mut player = Player::new(device.clone());
    player.load(two_hands());
    player.set_play_mode(PlayMode::RightOnly);
    player.set_metronome(false);
    player.play();
    player.tick(ms(0));

    // Both hands highlight, only the right hand sounds
    assert_eq!(player.sounding(), vec![Position::note(0, 0, 0, 0), Position::note(1, 0, 0, 0)]);
    assert_eq!(device.events(), vec![DeviceEvent::Note { pitch: 60, hand: Hand::Right }]);

    player.set_play_mode(PlayMode::LeftOnly);
    run(&mut player, 16, 2_000);
    assert_eq!(device.notes(), vec![60, 48]);
}

#[test]
fn speed_change_keeps_progress() {
    let mut player = Player::new(RecordingDevice::new());
    player.load(four_quarters(2));
    player.play();
    player.tick(ms(0));
    player.tick(ms(1_000));
    assert_eq!(player.current_time(), 1.0);

    player.set_speed_multiplier(2.0);
    assert!((player.current_time() - 0.5).abs() < EPS, "a quarter of the way through");
    assert!((player.schedule().total_duration - 2.0).abs() < EPS);

    // Elapsed time now runs against the faster schedule
    player.tick(ms(1_250));
    assert!((player.current_time() - 0.75).abs() < EPS);
    // Notes fired before the change are not fired again
    assert_eq!(player.next_entry(), 4);
}

#[test]
fn speed_change_while_resuming_ignores_the_pause() {
    let mut player = Player::new(RecordingDevice::new());
    player.load(four_quarters(2));
    player.play();
    player.tick(ms(0));
    player.tick(ms(1_000));
    player.pause();
    player.play();
    player.set_speed_multiplier(2.0);
    player.tick(ms(8_000));
    assert!((player.current_time() - 0.5).abs() < EPS, "at {}", player.current_time());

    player.set_tempo(60.0);
    player.tick(ms(8_400));
    assert!(player.is_playing());
    assert!((player.current_time() - 1.4).abs() < EPS, "at {}", player.current_time());
}

#[test]
fn set_tempo_overrides_before_speed() {
    let mut player = Player::new(RecordingDevice::new());
    player.load(four_quarters(1));
    player.set_speed_multiplier(0.5);
    player.set_tempo(60.0);
    // 60 bpm at half speed is 30 bpm: two seconds a beat
    assert!((player.schedule().beat_duration - 2.0).abs() < EPS);
    player.set_tempo(-1.0);
    assert_eq!(player.tempo(), 60.0);
}

#[test]
fn failing_device_keeps_the_visuals_moving() {
    let device = RecordingDevice::failing();
    let mut player = Player::new(device.clone());
    player.load(four_quarters(1));
    player.play();
    run(&mut player, 0, 1_100);
    assert!(player.is_playing());
    assert_eq!(player.state().sounding, vec![Position::note(0, 0, 2, 0)]);
    assert!(!device.clicks().is_empty(), "clicks were attempted");
}

#[test]
fn long_sessions_do_not_drift() {
    let mut player = Player::new(RecordingDevice::new());
    player.load(four_quarters(200));
    player.play();
    // Irregular tick spacing
    let mut t = 0u64;
    while t < 300_000 {
        player.tick(ms(t));
        t += if t % 3 == 0 { 17 } else { 15 };
    }
    player.tick(ms(300_000));
    assert_eq!(player.current_time(), 300.0);
}
