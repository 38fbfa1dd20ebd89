pub(crate) mod metronome;

pub use metronome::{emit_beat, Metronome, MetronomeConfig, MAX_BPM, MIN_BPM};
