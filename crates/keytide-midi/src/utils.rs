//! Key and channel range helpers.

use crate::{Error, Result};

/// Highest valid MIDI key number.
pub const MAX_KEY: u8 = 127;

/// Number of MIDI channels per device.
pub const NUM_CHANNELS: usize = 16;

/// Applies a signed transpose, returning `None` when the result leaves 0-127.
#[inline]
pub fn transpose_key(key: i32, offset: i32) -> Option<u8> {
    let shifted = key.checked_add(offset)?;
    u8::try_from(shifted).ok().filter(|k| *k <= MAX_KEY)
}

#[inline]
pub fn checked_key(key: i32) -> Result<u8> {
    transpose_key(key, 0).ok_or(Error::InvalidKey(key))
}

#[inline]
pub fn checked_channel(channel: u8) -> Result<u8> {
    if (channel as usize) < NUM_CHANNELS {
        Ok(channel)
    } else {
        Err(Error::InvalidChannel(channel))
    }
}
