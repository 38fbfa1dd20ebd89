pub(crate) mod config;
pub(crate) mod generator;

pub use config::{EchoConfig, EchoMode, MAX_INTERVAL_MS, UNITY};
pub use generator::{decay_amplitude, EchoGenerator, EchoState, MAX_AMPLITUDE};
