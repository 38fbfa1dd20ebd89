//! Driver integration tests
//!
//! The engine with its real-time driver thread: lifecycle and wall-clock
//! delivery. Timing assertions are loose so they hold on a loaded CI host.

use std::thread;
use std::time::{Duration, Instant};

use keytide::prelude::*;
use keytide::MidiOutputConsumer;

fn wait_for_note_on(output: &mut MidiOutputConsumer, key: u8, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        while let Some(event) = output.pop() {
            if event.event.is_note_on() && event.event.note() == Some(key) {
                return true;
            }
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_driver_delivers_key_press() {
    let mut engine = KeytideEngine::builder().devices(1).build().unwrap();
    let mut output = engine.take_output().unwrap();
    assert!(engine.is_driven());

    engine.key_press(0, 0, 60, 100, 20);
    assert!(wait_for_note_on(&mut output, 60, Duration::from_secs(2)));
}

#[test]
fn test_driver_runs_echo() {
    let mut engine = KeytideEngine::builder().devices(1).build().unwrap();
    let mut output = engine.take_output().unwrap();
    let _echo = engine
        .echo(EchoConfig::default())
        .unwrap()
        .repeat_ms(20)
        .transpose(7)
        .enable();

    engine.key_press(0, 0, 60, 100, 0);
    assert!(wait_for_note_on(&mut output, 67, Duration::from_secs(2)));
}

#[test]
fn test_stop_driver_freezes_clock() {
    let mut engine = KeytideEngine::builder().build().unwrap();
    engine.stop_driver();
    assert!(!engine.is_driven());

    let frozen = engine.now();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(engine.now(), frozen);

    engine.advance_to(frozen + 100);
    assert_eq!(engine.now(), frozen + 100);
}

#[test]
fn test_output_taken_once() {
    let mut engine = KeytideEngine::builder().manual_clock().build().unwrap();
    assert!(engine.take_output().is_ok());
    assert!(matches!(
        engine.take_output(),
        Err(keytide::Error::OutputTaken)
    ));
}

#[test]
fn test_custom_sink_has_no_consumer() {
    let mut engine = KeytideEngine::builder()
        .sink(keytide::NullSink)
        .manual_clock()
        .build()
        .unwrap();
    assert!(engine.take_output().is_err());
}

#[test]
fn test_invalid_config_rejected() {
    let result = KeytideEngine::builder().views(0).manual_clock().build();
    assert!(matches!(result, Err(keytide::Error::Core(_))));
}
