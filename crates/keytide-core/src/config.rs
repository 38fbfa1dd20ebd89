//! Core configuration.

use serde::{Deserialize, Serialize};

use crate::noise::DEFAULT_SEED;
use crate::{Error, Result};

/// Most output devices a mute map can describe.
pub const MAX_DEVICES: usize = 16;

/// Most score views.
pub const MAX_VIEWS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Independent score views, each with its own pressed-key table.
    pub num_views: usize,
    /// Output devices fanned out to on dispatch.
    pub num_devices: usize,
    /// Slots per pressed-key table.
    pub table_capacity: usize,
    /// Noise seed.
    pub seed: u64,
    /// Wake-up interval of the timer driver thread, in ms.
    pub tick_interval_ms: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            num_views: 2,
            num_devices: 4,
            table_capacity: crate::keys::TABLE_CAPACITY,
            seed: DEFAULT_SEED,
            tick_interval_ms: 1,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_views == 0 || self.num_views > MAX_VIEWS {
            return Err(Error::InvalidConfig(format!(
                "num_views {} out of range (1-{})",
                self.num_views, MAX_VIEWS
            )));
        }
        if self.num_devices == 0 || self.num_devices > MAX_DEVICES {
            return Err(Error::InvalidConfig(format!(
                "num_devices {} out of range (1-{})",
                self.num_devices, MAX_DEVICES
            )));
        }
        if self.table_capacity == 0 {
            return Err(Error::InvalidConfig(
                "table_capacity must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > 100 {
            return Err(Error::InvalidConfig(format!(
                "tick_interval_ms {} out of range (1-100)",
                self.tick_interval_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.num_views, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_counts() {
        let config = CoreConfig {
            num_devices: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CoreConfig {
            num_views: MAX_VIEWS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
