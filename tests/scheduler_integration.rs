//! Scheduler integration tests
//!
//! Key tables, echo and metronome driven end to end through the engine on a
//! manual clock.
//!
//! Run with:
//! ```bash
//! cargo test -p keytide --test scheduler_integration
//! ```

use keytide::prelude::*;

mod helpers;
use helpers::*;

/// Pressing then releasing a key updates the lowest-key scan.
#[test]
fn test_press_release_scan_lowest() {
    let (engine, mut output) = test_engine(1);

    assert!(matches!(
        engine.key_press(0, 0, 60, 100, 0),
        PressOutcome::Inserted(_)
    ));
    assert_eq!(engine.scan_lowest(0, 0), Some(60));

    assert!(engine.key_release(0, 0, 60, 0));
    assert_eq!(engine.scan_lowest(0, 0), None);

    engine.advance_to(0);
    let events = output.drain_all();
    assert_eq!(events.len(), 2);
    assert!(events[0].event.is_note_on());
    assert!(events[1].event.is_note_off());
}

/// Views keep separate tables.
#[test]
fn test_views_are_independent() {
    let (engine, _output) = test_engine(1);
    engine.key_press(0, 0, 64, 100, 0);
    engine.key_press(1, 0, 48, 100, 0);
    engine.key_press(0, 0, 60, 100, 0);

    assert_eq!(engine.chord(0, 0).as_slice(), &[60, 64]);
    assert_eq!(engine.chord(1, 0).as_slice(), &[48]);
    assert_eq!(engine.scan_lowest(1, 0), Some(48));
}

/// A full table drops the press; the later release is a no-op.
#[test]
fn test_full_table_drops_press() {
    let mut engine = KeytideEngine::builder()
        .table_capacity(2)
        .manual_clock()
        .build()
        .unwrap();
    let _output = engine.take_output().unwrap();

    engine.key_press(0, 0, 60, 100, 0);
    engine.key_press(0, 0, 62, 100, 0);
    assert_eq!(engine.key_press(0, 0, 64, 100, 0), PressOutcome::Dropped);
    assert!(!engine.key_release(0, 0, 64, 0));
    assert_eq!(engine.chord(0, 0).as_slice(), &[60, 62]);
}

/// After `num_echo` ticks with the key held, further ticks are silent.
#[test]
fn test_echo_stops_after_count() {
    let (engine, mut output) = test_engine(1);
    let echo = engine
        .echo(EchoConfig {
            num_echo: 3,
            ival_repeat: 100,
            ..Default::default()
        })
        .unwrap()
        .enable();

    engine.key_press(0, 0, 60, 100, 0);
    run_until(&engine, 600);

    let ons = note_ons(&output.drain_all());
    assert_eq!(ons, vec![(0, 60), (100, 60), (200, 60), (300, 60)]);
    assert_eq!(echo.state(), Some(EchoState::Armed));
}

/// Echo velocities decay by `amp_fact / 128` per tick.
#[test]
fn test_echo_velocity_decays() {
    let (engine, mut output) = test_engine(1);
    let _echo = engine
        .echo(EchoConfig::default())
        .unwrap()
        .repeat_ms(100)
        .decay(64)
        .count(3)
        .enable();

    engine.key_press(0, 0, 60, 120, 0);
    run_until(&engine, 400);

    let velocities: Vec<u8> = output
        .drain_all()
        .iter()
        .filter(|e| e.event.is_note_on() && e.event.time_ms > 0)
        .filter_map(|e| e.event.velocity())
        .collect();
    assert_eq!(velocities, vec![120, 60, 30]);
}

/// Base-only mode echoes the base key and its octave, not the next octave up.
#[test]
fn test_echo_base_only_octave() {
    let (engine, mut output) = test_engine(1);
    let _echo = engine
        .echo(EchoConfig::default())
        .unwrap()
        .repeat_ms(100)
        .mode(EchoMode::BaseOnly)
        .transpose(12)
        .enable();

    engine.key_press(0, 0, 60, 100, 0);
    engine.key_press(0, 0, 72, 100, 0);
    engine.key_press(0, 0, 84, 100, 0);
    run_until(&engine, 200);

    let events = output.drain_all();
    assert_eq!(keys_at(&events, 0), vec![60, 72, 84]);
    assert_eq!(keys_at(&events, 100), vec![72, 84]);
    assert_eq!(keys_at(&events, 200), vec![72, 84]);
}

/// Slide mode walks the held keys round-robin.
#[test]
fn test_echo_slide_walks_keys() {
    let (engine, mut output) = test_engine(1);
    let _echo = engine
        .echo(EchoConfig::default())
        .unwrap()
        .repeat_ms(100)
        .mode(EchoMode::Slide)
        .decay(128)
        .count(4)
        .enable();

    engine.key_press(0, 0, 60, 100, 0);
    engine.key_press(0, 0, 64, 100, 0);
    run_until(&engine, 400);

    let echoed: Vec<u8> = note_ons(&output.drain_all())
        .into_iter()
        .filter(|&(t, _)| t > 0)
        .map(|(_, key)| key)
        .collect();
    assert_eq!(echoed, vec![60, 64, 60, 64]);
}

/// Releasing and pressing the key again starts a new echo sequence.
#[test]
fn test_echo_restarts_on_repress() {
    let (engine, mut output) = test_engine(1);
    let _echo = engine
        .echo(EchoConfig::default())
        .unwrap()
        .repeat_ms(100)
        .count(1)
        .enable();

    engine.key_press(0, 0, 60, 100, 0);
    run_until(&engine, 250);
    engine.key_release(0, 0, 60, 0);
    engine.key_press(0, 0, 60, 100, 0);
    run_until(&engine, 500);

    let ons = note_ons(&output.drain_all());
    assert_eq!(ons, vec![(0, 60), (100, 60), (250, 60), (300, 60)]);
}

/// Dropping the handle removes the generator; no echo fires afterwards.
#[test]
fn test_echo_handle_drop_stops_echo() {
    let (engine, mut output) = test_engine(1);
    let echo = engine
        .echo(EchoConfig::default())
        .unwrap()
        .repeat_ms(100)
        .enable();
    engine.key_press(0, 0, 60, 100, 0);
    run_until(&engine, 150);
    drop(echo);
    run_until(&engine, 600);

    let ons = note_ons(&output.drain_all());
    assert_eq!(ons, vec![(0, 60), (100, 60)]);
    assert!(engine.with(|state| state.timers().is_empty()));
}

/// One bar every 500 ms at 120 BPM, on the bar key.
#[test]
fn test_metronome_period() {
    let (engine, mut output) = test_engine(1);
    let metronome = engine.metronome().tempo(120).on();
    engine.set_trigger(true);

    run_until(&engine, 2000);
    let ons = note_ons(&output.drain_all());
    assert_eq!(ons, vec![(500, 76), (1000, 76), (1500, 76), (2000, 76)]);
    assert_eq!(metronome.bars(), 4);
}

/// Nothing is emitted until the trigger is set, nor while paused.
#[test]
fn test_metronome_gated_by_transport() {
    let (engine, mut output) = test_engine(1);
    engine.metronome().on();

    run_until(&engine, 1000);
    assert!(output.drain_all().is_empty());

    engine.set_trigger(true);
    engine.set_paused(true);
    run_until(&engine, 2000);
    assert!(output.drain_all().is_empty());

    engine.set_paused(false);
    run_until(&engine, 2500);
    assert_eq!(note_ons(&output.drain_all()), vec![(2500, 76)]);
}

/// Tempo changes take effect from the next bar.
#[test]
fn test_metronome_tempo_change() {
    let (engine, mut output) = test_engine(1);
    let metronome = engine.metronome().tempo(120).on();
    engine.set_trigger(true);

    run_until(&engine, 500);
    let _metronome = metronome.tempo(60);
    run_until(&engine, 2500);

    let times: Vec<u64> = note_ons(&output.drain_all())
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(times, vec![500, 1500, 2500]);
}

/// Muted channels and controllers are filtered per device.
#[test]
fn test_mute_map_fan_out() {
    let (engine, mut output) = test_engine(2);
    engine
        .mute(|mute| mute.set_channel_muted(1, 0, true))
        .unwrap();
    engine.mute(|mute| mute.set_mute_pedal(0, true)).unwrap();

    engine.schedule_key(0, 60, 100, 0, 0);
    engine.schedule_key(1, 62, 100, 0, 0);
    engine.schedule_control(1, 64, 127, 0);
    engine.advance_to(0);

    let events = output.drain_all();
    let device0 = for_device(&events, 0);
    let device1 = for_device(&events, 1);

    assert_eq!(note_ons(&device0), vec![(0, 60), (0, 62)]);
    assert!(device0.iter().all(|e| e.event.controller().is_none()));

    assert_eq!(note_ons(&device1), vec![(0, 62)]);
    assert_eq!(device1.iter().filter(|e| e.event.controller() == Some(64)).count(), 1);
}

/// Local-keys control sends CC 122 on every channel.
#[test]
fn test_local_keys_control() {
    let (engine, mut output) = test_engine(1);
    engine.set_local_keys(0, LocalKeys::Disable).unwrap();
    engine.advance_to(0);

    let events = output.drain_all();
    assert_eq!(events.len(), 16);
    assert!(events.iter().all(|e| e.event.controller() == Some(122)));
    assert!(engine.set_local_keys(4, LocalKeys::Enable).is_err());
}

/// Panic drops pending output and releases every held key.
#[test]
fn test_panic() {
    let (engine, mut output) = test_engine(1);
    engine.key_press(0, 0, 60, 100, 100);
    engine.key_press(0, 1, 67, 100, 100);
    engine.schedule_key(2, 70, 100, 50, 0);

    assert_eq!(engine.panic(), 2);
    run_until(&engine, 200);

    let events = output.drain_all();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event.is_note_off()));
    assert!(engine.chord(0, 0).is_empty());
}

/// The same seed replays the same humanized timing.
#[test]
fn test_seeded_timing_is_reproducible() {
    let render = |seed: u64| {
        let mut engine = KeytideEngine::builder()
            .seed(seed)
            .manual_clock()
            .build()
            .unwrap();
        let mut output = engine.take_output().unwrap();
        let _echo = engine
            .echo(EchoConfig::default())
            .unwrap()
            .repeat_ms(100)
            .random_ms(40)
            .count(4)
            .enable();
        engine.key_press(0, 0, 60, 100, 0);
        run_until(&engine, 600);
        note_ons(&output.drain_all())
    };

    let first = render(42);
    assert_eq!(first, render(42));
    assert_eq!(first.len(), 5);
}
