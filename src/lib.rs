//! # Keytide - Real-time Key and Chord Event Scheduler
//!
//! Delayed MIDI output, held-key tracking, echo and metronome for a score
//! editor's playback and input paths.
//!
//! ## Architecture
//!
//! Keytide is an umbrella crate that coordinates:
//! - **keytide-core** - Scheduler kernel (output queue, key tables, timers, echo, metronome)
//! - **keytide-midi** - MIDI value types, sinks and the output ring buffer
//!
//! ## Quick Start
//!
//! ```ignore
//! use keytide::prelude::*;
//!
//! let mut engine = KeytideEngine::builder().devices(2).build()?;
//! let mut output = engine.take_output()?;
//!
//! // Echo the held chord three times
//! let echo = engine.echo(EchoConfig::default())?.count(3).enable();
//!
//! // Click at 100 bars per minute while the transport runs
//! engine.metronome().tempo(100).on();
//! engine.set_trigger(true);
//!
//! engine.key_press(0, 0, 60, 100, 0);
//! ```

/// Re-export of keytide-core for direct access
pub use keytide_core as core;

/// Re-export of keytide-midi for direct access
pub use keytide_midi as midi;

pub use keytide_core::{
    // Keys
    Chord,
    Core,
    CoreConfig,
    CoreState,
    DeviceMute,
    // Echo
    EchoConfig,
    EchoHandle,
    EchoId,
    EchoMode,
    EchoState,
    LocalKeys,
    // Metronome
    MetronomeConfig,
    MetronomeHandle,
    // Output
    MuteMap,
    OutputScheduler,
    PressOutcome,
    PressedKey,
    PressedKeyTable,
    // Timers
    TimerAction,
    TimerDriver,
    TimerId,
};

pub use keytide_midi::{DeviceEvent, MidiEvent, MidiOutputConsumer, MidiSink, NullSink};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::KeytideEngineBuilder;
pub use engine::KeytideEngine;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{KeytideEngine, KeytideEngineBuilder};

    // Generators
    pub use crate::{
        EchoConfig, EchoHandle, EchoMode, EchoState, MetronomeConfig, MetronomeHandle,
    };

    // Keys and output
    pub use crate::{DeviceEvent, LocalKeys, MidiEvent, PressOutcome};
}
