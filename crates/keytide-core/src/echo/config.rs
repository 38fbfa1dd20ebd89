//! Echo configuration.

use keytide_midi::NUM_CHANNELS;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Full scale of the 128-based factors (`amp_init`, `amp_fact`, `amp_rand`).
pub const UNITY: u32 = 128;

/// Longest interval accepted by [`EchoConfig::validate`], in milliseconds.
pub const MAX_INTERVAL_MS: u32 = 60_000;

/// Which held keys an echo tick re-emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EchoMode {
    /// Every held key on the input channel.
    #[default]
    Default,
    /// The lowest key plus the nearest held key a whole number of octaves above it.
    BaseOnly,
    /// One key per tick, rotating through the held keys.
    Slide,
}

impl From<u8> for EchoMode {
    fn from(value: u8) -> Self {
        match value {
            1 => EchoMode::BaseOnly,
            2 => EchoMode::Slide,
            _ => EchoMode::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Delay from a tick to its echo notes, in ms.
    pub ival_init: u32,
    /// Tick period, in ms. Echo notes last half of it.
    pub ival_repeat: u32,
    /// Upper bound of the random delay added to `ival_init`, in ms.
    pub ival_rand: u32,
    /// Initial amplitude as a fraction of the pressed velocity (128 = 100%).
    pub amp_init: u32,
    /// Per-tick amplitude multiplier (128 = no decay).
    pub amp_fact: u32,
    /// Random amplitude added per tick (128 = up to one full velocity step).
    pub amp_rand: u32,
    pub num_echo: u32,
    pub transpose: i32,
    pub in_channel: u8,
    pub out_channel: u8,
    /// Index of the view whose pressed keys are echoed.
    pub view: usize,
    pub mode: EchoMode,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            ival_init: 0,
            ival_repeat: 250,
            ival_rand: 0,
            amp_init: UNITY,
            amp_fact: 96,
            amp_rand: 0,
            num_echo: 4,
            transpose: 0,
            in_channel: 0,
            out_channel: 0,
            view: 0,
            mode: EchoMode::Default,
        }
    }
}

impl EchoConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ival_init", self.ival_init),
            ("ival_repeat", self.ival_repeat),
            ("ival_rand", self.ival_rand),
        ] {
            if value > MAX_INTERVAL_MS {
                return Err(Error::InvalidConfig(format!(
                    "{} {} ms out of range (0-{})",
                    name, value, MAX_INTERVAL_MS
                )));
            }
        }
        for (name, value) in [
            ("amp_init", self.amp_init),
            ("amp_fact", self.amp_fact),
            ("amp_rand", self.amp_rand),
        ] {
            if value > UNITY {
                return Err(Error::InvalidConfig(format!(
                    "{} {} out of range (0-{})",
                    name, value, UNITY
                )));
            }
        }
        if self.transpose.abs() > 127 {
            return Err(Error::InvalidConfig(format!(
                "transpose {} out of range (-127..=127)",
                self.transpose
            )));
        }
        if self.in_channel as usize >= NUM_CHANNELS {
            return Err(keytide_midi::Error::InvalidChannel(self.in_channel).into());
        }
        if self.out_channel as usize >= NUM_CHANNELS {
            return Err(keytide_midi::Error::InvalidChannel(self.out_channel).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EchoConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = EchoConfig {
            amp_fact: 200,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = EchoConfig {
            out_channel: 16,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Midi(_))));
    }

    #[test]
    fn test_mode_from_u8() {
        assert_eq!(EchoMode::from(0), EchoMode::Default);
        assert_eq!(EchoMode::from(1), EchoMode::BaseOnly);
        assert_eq!(EchoMode::from(2), EchoMode::Slide);
        assert_eq!(EchoMode::from(9), EchoMode::Default);
    }
}
