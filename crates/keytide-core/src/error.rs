//! Error types for keytide-core.

use thiserror::Error;

/// Error type for keytide-core configuration and setup.
///
/// The scheduling hot paths never return these; out-of-range keys and full
/// tables are dropped there instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid view index: {0}")]
    InvalidView(usize),

    #[error("Invalid device index: {0}")]
    InvalidDevice(usize),

    #[error("Invalid tempo: {0}. Must be between 1 and 999 BPM")]
    InvalidTempo(u32),

    #[error("Timer driver is not running")]
    DriverStopped,

    #[error(transparent)]
    Midi(#[from] keytide_midi::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
