//! MIDI value types for the keytide key scheduler.
//!
//! - [`MidiEvent`]: channel-voice message stamped with an absolute logical time
//! - [`MidiSink`]: where dispatched events go (one call per device)
//! - [`midi_output_channel`]: lock-free ring buffer sink for an output driver
//! - key/channel range helpers used by every producer of events

pub mod error;
pub use error::{Error, Result};

pub(crate) mod event;
pub use event::{DeviceEvent, MidiEvent};

pub mod output_collector;
pub use output_collector::{
    midi_output_channel, midi_output_channel_with_capacity, MidiOutputConsumer,
    MidiOutputProducer,
};

pub mod sink;
pub use sink::{MidiSink, NullSink};

pub mod utils;
pub use utils::{checked_channel, checked_key, transpose_key, MAX_KEY, NUM_CHANNELS};

// Re-export essential upstream types
pub use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};
