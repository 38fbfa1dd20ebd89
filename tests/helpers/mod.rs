//! Test helpers and fixtures for keytide integration tests
//!
//! Engines are built on a manual clock so every test steps logical time
//! itself and sees a deterministic event stream.

#![allow(dead_code)]

use keytide::prelude::*;
use keytide::MidiOutputConsumer;
use tracing_subscriber::EnvFilter;

/// Step used when walking the clock forward.
pub const TEST_STEP_MS: u64 = 10;

/// Route engine logs to the test harness. Set `RUST_LOG=keytide_core=trace`
/// to see per-tick decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Manual-clock engine with `devices` output devices and its output consumer.
pub fn test_engine(devices: usize) -> (KeytideEngine, MidiOutputConsumer) {
    init_tracing();
    let mut engine = KeytideEngine::builder()
        .devices(devices)
        .manual_clock()
        .build()
        .expect("Failed to create test engine");
    let output = engine.take_output().expect("output consumer available");
    (engine, output)
}

/// Advance the clock from its current time to `until`, `TEST_STEP_MS` at a time.
pub fn run_until(engine: &KeytideEngine, until: u64) {
    let mut now = engine.now();
    while now < until {
        now = (now + TEST_STEP_MS).min(until);
        engine.advance_to(now);
    }
}

/// (time, key) of every note-on.
pub fn note_ons(events: &[DeviceEvent]) -> Vec<(u64, u8)> {
    events
        .iter()
        .filter(|e| e.event.is_note_on())
        .filter_map(|e| e.event.note().map(|note| (e.event.time_ms, note)))
        .collect()
}

/// Keys of the note-ons due exactly at `time`, ascending.
pub fn keys_at(events: &[DeviceEvent], time: u64) -> Vec<u8> {
    let mut keys: Vec<u8> = note_ons(events)
        .into_iter()
        .filter(|&(t, _)| t == time)
        .map(|(_, key)| key)
        .collect();
    keys.sort_unstable();
    keys
}

/// Events delivered to one device.
pub fn for_device(events: &[DeviceEvent], device: usize) -> Vec<DeviceEvent> {
    events.iter().filter(|e| e.device == device).copied().collect()
}
