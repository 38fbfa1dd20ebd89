//! Real-time key scheduler kernel: pressed-key tables, delayed MIDI output,
//! timer callbacks, echo and metronome.
//!
//! # Primary API
//!
//! - [`Core`] / [`CoreState`]: shared state behind the global lock
//! - [`OutputScheduler`]: time-ordered output queue with device fan-out
//! - [`PressedKeyTable`]: held keys per score view
//! - [`TimerRegistry`]: periodic callbacks driven by logical time
//! - [`EchoHandle`] / [`MetronomeHandle`]: fluent control of the generators
//! - [`TimerDriver`]: wall-clock thread that advances the core
//!
//! # Example
//!
//! ```ignore
//! use keytide_core::{Core, CoreConfig, EchoConfig};
//! use keytide_midi::midi_output_channel;
//!
//! let (producer, mut consumer) = midi_output_channel();
//! let core = Core::new(CoreConfig::default(), Box::new(producer))?;
//! let _echo = core.echo(EchoConfig::default())?.count(3).enable();
//!
//! core.lock().key_press(0, 0, 60, 100, 0);
//! core.advance_to(1000);
//! for event in consumer.drain_all() {
//!     println!("{:?}", event);
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{CoreConfig, MAX_DEVICES, MAX_VIEWS};

pub(crate) mod clock;
pub use clock::LogicalClock;

pub(crate) mod noise;
pub use noise::{Noise, DEFAULT_SEED};

pub(crate) mod output;
pub use output::{DeviceMute, LocalKeys, MuteMap, OutputScheduler, CC_LOCAL_CONTROL, CC_PEDAL};

pub(crate) mod keys;
pub use keys::{Chord, PressOutcome, PressedKey, PressedKeyTable, TABLE_CAPACITY};

pub mod timer;
pub use timer::{DueTimer, TimerAction, TimerCallback, TimerId, TimerRegistry};

pub(crate) mod echo;
pub use echo::{
    decay_amplitude, EchoConfig, EchoGenerator, EchoMode, EchoState, MAX_AMPLITUDE,
    MAX_INTERVAL_MS, UNITY,
};

pub(crate) mod transport;
pub use transport::{emit_beat, Metronome, MetronomeConfig, MAX_BPM, MIN_BPM};

mod state;
pub use state::{Core, CoreState, EchoId};

mod handle;
pub use handle::{EchoHandle, MetronomeHandle};

mod driver;
pub use driver::TimerDriver;
