//! Error types for MIDI value handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid MIDI channel: {0}. Must be 0-15")]
    InvalidChannel(u8),

    #[error("Invalid MIDI key: {0}. Must be 0-127")]
    InvalidKey(i32),
}

pub type Result<T> = std::result::Result<T, Error>;
